//! Shell script rendering
//!
//! Pure rendering: takes a manifest and its batches, returns the script text
//! plus any side files the script reads. Nothing here touches the disk.

use std::path::PathBuf;

use super::quote::quote;
use crate::models::{Batch, Manifest};
use crate::results::ArtifactStore;

/// Merge invocation appended after the last batch
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeStep {
    pub program: String,
    pub output_dir: String,
    pub run_id: String,
    pub workflow_id: Option<String>,
    pub prefix: String,
}

impl MergeStep {
    fn render(&self) -> String {
        let mut args = vec![
            self.program.as_str(),
            "--merge-results",
            "--output-dir",
            self.output_dir.as_str(),
            "--pr-id",
            self.run_id.as_str(),
        ];
        if let Some(workflow) = &self.workflow_id {
            args.extend(["--workflow-id", workflow.as_str()]);
        }
        if !self.prefix.is_empty() {
            args.extend(["--prefix", self.prefix.as_str()]);
        }
        shell_words::join(args)
    }
}

/// Rendering settings
#[derive(Clone, Debug)]
pub struct ScriptOptions {
    /// Wrapper used when an environment is selected (e.g. `tox`)
    pub launcher: String,
    /// Named environment; `None` invokes each batch's executable directly
    pub environment: Option<String>,
    /// Blocks longer than this read their tests from a side file
    pub max_command_length: usize,
    pub merge_step: Option<MergeStep>,
}

/// File the script reads at run time
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SideFile {
    pub path: PathBuf,
    pub content: String,
}

/// Rendered script and the files it depends on
#[derive(Clone, Debug, Default)]
pub struct RenderedScript {
    pub text: String,
    pub side_files: Vec<SideFile>,
}

/// Renders the per-batch runner invocations
pub struct ScriptRenderer<'a> {
    store: &'a ArtifactStore,
    options: ScriptOptions,
}

impl<'a> ScriptRenderer<'a> {
    pub fn new(store: &'a ArtifactStore, options: ScriptOptions) -> Self {
        Self { store, options }
    }

    pub fn render(&self, manifest: &Manifest, batches: &[Batch]) -> RenderedScript {
        let mut lines = vec![
            "#!/bin/bash".to_string(),
            format!("# Test commands for PR-{}", manifest.pr_id),
            format!("# Total batches: {}", manifest.batch_count),
            String::new(),
        ];
        let mut side_files = Vec::new();

        for batch in batches {
            lines.push(format!(
                "echo {}",
                quote(&format!("Running batch {}...", batch.batch_id))
            ));

            let invocation = self.invocation(batch);
            let inline = inline_block(&invocation, batch);

            if inline.len() > self.options.max_command_length {
                let path = self.store.tests_list_path(batch.batch_id);
                let var = format!("BATCH_{}_TESTS", batch.batch_id);
                let mut content = batch
                    .command
                    .test_identifiers
                    .iter()
                    .map(|t| t.as_str())
                    .collect::<Vec<_>>()
                    .join("\n");
                content.push('\n');

                lines.push(format!(
                    "mapfile -t {var} < {}",
                    quote(&path.display().to_string())
                ));
                lines.push(format!("{invocation} \"${{{var}[@]}}\" || true"));
                side_files.push(SideFile { path, content });
            } else {
                lines.push(inline);
            }
            lines.push(String::new());
        }

        if let Some(step) = &self.options.merge_step {
            lines.push(format!("echo {}", quote("Merging batch results...")));
            lines.push(step.render());
        }

        let mut text = lines.join("\n");
        text.push('\n');

        RenderedScript { text, side_files }
    }

    /// Launcher prefix plus the batch's options, without tests
    fn invocation(&self, batch: &Batch) -> String {
        let prefix = match &self.options.environment {
            Some(env) => format!(
                "{} -e {} --",
                shell_words::quote(&self.options.launcher),
                quote(env)
            ),
            None => shell_words::quote(&batch.command.executable).into_owned(),
        };
        if batch.command.options.is_empty() {
            prefix
        } else {
            format!("{prefix} {}", shell_words::join(&batch.command.options))
        }
    }
}

fn inline_block(invocation: &str, batch: &Batch) -> String {
    let mut block = invocation.to_string();
    for test in &batch.command.test_identifiers {
        block.push_str(" \\\n  ");
        block.push_str(&quote(test.as_str()));
    }
    block.push_str(" || true");
    block
}
