// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages shown in the host's error modal.
//
// Every bridge failure that reaches the user is mapped to a title, a plain
// message and a concrete suggestion. Severity drives the modal styling.

use crate::error::BridgeError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Trying again may well work (clipboard permission, pop-up blocked).
    Transient,
    /// The user must do something first (free storage, pick a smaller file).
    ActionRequired,
    /// Cannot be fixed by retrying: bad data or a missing host feature.
    Permanent,
}

/// A human-readable error with title, message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Modal title.
    pub title: String,
    /// Plain English summary.
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
    /// Severity level (drives icon/colour in the modal).
    pub severity: Severity,
}

impl HumanError {
    /// Message and suggestion joined for hosts that only show one text block.
    pub fn body(&self) -> String {
        format!("{}\n\n{}", self.message, self.suggestion)
    }
}

/// Convert a `BridgeError` into a `HumanError`.
pub fn humanize_error(err: &BridgeError) -> HumanError {
    match err {
        BridgeError::OutOfMemory { requested } => HumanError {
            title: "Out of Memory".into(),
            message: format!("There wasn't enough memory to finish this ({requested} bytes needed)."),
            suggestion: "Close other tabs or reload the page, then try again.".into(),
            severity: Severity::ActionRequired,
        },

        BridgeError::InvalidHandle { .. } => HumanError {
            title: "Internal Error".into(),
            message: "The application tried to use memory it had already released.".into(),
            suggestion: "Reload the page. If this keeps happening, please report it.".into(),
            severity: Severity::Permanent,
        },

        BridgeError::QuotaExceeded(_) => HumanError {
            title: "Storage Full".into(),
            message: "Your browser's storage for this site is full, so the file was not saved.".into(),
            suggestion: "Delete old documents you no longer need, or export your data to a file and remove it from browser storage.".into(),
            severity: Severity::ActionRequired,
        },

        BridgeError::Storage(detail) => HumanError {
            title: "Storage Error".into(),
            message: "Browser storage reported a problem.".into(),
            suggestion: format!("Check that site storage is enabled, then try again. ({detail})"),
            severity: Severity::Transient,
        },

        BridgeError::NotFound(name) => HumanError {
            title: "File Not Found".into(),
            message: format!("\"{name}\" isn't in browser storage."),
            suggestion: "Open the file again from your computer.".into(),
            severity: Severity::ActionRequired,
        },

        BridgeError::Encoding(_) => HumanError {
            title: "Damaged Data".into(),
            message: "A stored document could not be read back.".into(),
            suggestion: "The stored copy may be damaged. Open the original file from your computer instead.".into(),
            severity: Severity::Permanent,
        },

        BridgeError::MalformedInput(detail) => HumanError {
            title: "Invalid Data".into(),
            message: "The application provided invalid data for this dialog.".into(),
            suggestion: format!("This may be a bug. Please report it. ({detail})"),
            severity: Severity::Permanent,
        },

        BridgeError::FileTooLarge { max, .. } => HumanError {
            title: "File Too Large".into(),
            message: format!("File too large. Maximum size is {}MB.", max / (1024 * 1024)),
            suggestion: "Choose a smaller file.".into(),
            severity: Severity::ActionRequired,
        },

        BridgeError::ExternalResource(detail) => HumanError {
            title: "Browser Feature Unavailable".into(),
            message: "A browser feature didn't respond.".into(),
            suggestion: format!("Check the site's permissions and pop-up settings, then try again. ({detail})"),
            severity: Severity::Transient,
        },

        BridgeError::AlreadySuspended => HumanError {
            title: "Dialog Already Open".into(),
            message: "Another dialog is still waiting for an answer.".into(),
            suggestion: "Finish or cancel the open dialog first.".into(),
            severity: Severity::ActionRequired,
        },

        BridgeError::Serialization(_) => HumanError {
            title: "Internal Error".into(),
            message: "The application had an internal data problem.".into(),
            suggestion: "Try again. If this keeps happening, please report it.".into(),
            severity: Severity::Transient,
        },

        BridgeError::PlatformUnavailable => HumanError {
            title: "Not Supported".into(),
            message: "This feature isn't available in your browser.".into(),
            suggestion: "Try a recent version of Firefox, Chrome, Edge or Safari.".into(),
            severity: Severity::Permanent,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_is_actionable() {
        let human = humanize_error(&BridgeError::QuotaExceeded("setItem rejected".into()));
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(human.suggestion.contains("export"));
        assert!(human.suggestion.contains("Delete old"));
    }

    #[test]
    fn generic_storage_error_is_not_quota_message() {
        let human = humanize_error(&BridgeError::Storage("disabled".into()));
        assert_eq!(human.severity, Severity::Transient);
        assert!(!human.suggestion.contains("export"));
    }

    #[test]
    fn file_too_large_reports_megabytes() {
        let human = humanize_error(&BridgeError::FileTooLarge {
            size: 60 * 1024 * 1024,
            max: 50 * 1024 * 1024,
        });
        assert!(human.message.contains("50MB"));
    }

    #[test]
    fn malformed_input_is_permanent() {
        let human = humanize_error(&BridgeError::MalformedInput("choices".into()));
        assert_eq!(human.severity, Severity::Permanent);
        assert_eq!(human.title, "Invalid Data");
    }
}
