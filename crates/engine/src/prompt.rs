// SPDX-License-Identifier: MIT

//! Initial prompts sent to the editor after a session starts.

use wt_core::{CompletionCondition, MergeMode};

/// How the work lands, phrased for the editor prompt.
fn merge_sentence(mode: MergeMode) -> &'static str {
    match mode {
        MergeMode::Direct => "When you are finished, run `wt done` to merge directly into the default branch.",
        MergeMode::PrAuto => "When you are finished, run `wt done`; a pull request will be opened with auto-merge enabled.",
        MergeMode::PrReview => "When you are finished, run `wt done`; a pull request will be opened for human review.",
    }
}

/// Prompt for a new bead session.
pub fn bead_prompt(bead_id: &str, title: &str, mode: MergeMode) -> String {
    format!(
        "You are working on bead {bead_id}: {title}\n\
         Run `bd show {bead_id}` for the full description.\n\
         Commit your work on this branch as you go. \
         Signal progress with `wt signal <working|ready|blocked|error> [message]`.\n\
         {}",
        merge_sentence(mode)
    )
}

/// Prompt for a new task session.
pub fn task_prompt(description: &str, condition: CompletionCondition, mode: MergeMode) -> String {
    let condition_sentence = match condition {
        CompletionCondition::None => String::new(),
        CompletionCondition::Pushed => {
            "\nThis task completes once the branch is pushed.".to_string()
        }
        CompletionCondition::PrMerged => {
            "\nThis task completes once its pull request is merged; record the PR URL with `wt signal ready <url>`.".to_string()
        }
        CompletionCondition::TestsPass => {
            "\nThis task completes once the project tests pass.".to_string()
        }
        CompletionCondition::UserConfirm => String::new(),
    };
    format!(
        "Task: {description}{condition_sentence}\n\
         Signal progress with `wt signal <working|ready|blocked|error> [message]`.\n\
         {}",
        merge_sentence(mode)
    )
}

/// Per-bead prompt for the epic runner. The hub merges once at the end, so
/// the worker must not run `wt done`.
pub fn auto_bead_prompt(bead_id: &str, title: &str, epic_id: &str) -> String {
    format!(
        "Next bead in epic {epic_id}: {bead_id}: {title}\n\
         Run `bd show {bead_id}` for the full description.\n\
         Work only on this bead, commit on the current branch, then run \
         `wt signal ready`. Do NOT run `wt done`; the hub merges the whole \
         epic at the end."
    )
}

#[cfg(test)]
#[path = "prompt_tests.rs"]
mod tests;
