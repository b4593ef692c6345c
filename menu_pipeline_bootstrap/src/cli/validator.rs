// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # CLI Argument Validation
//!
//! A second, independent pass over clap's already-typed output: rejects
//! path traversal and shell metacharacters before any argument reaches
//! the filesystem or a subprocess. Grounded on the upstream `SecureArgParser`.

use std::path::PathBuf;

use thiserror::Error;

/// Characters that have no legitimate place in a pipeline argument: shell
/// metacharacters, null bytes, and other injection vectors.
const FORBIDDEN_CHARS: &[char] = &['\0', ';', '|', '&', '$', '`', '\n', '\r'];

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("argument '{arg}' is invalid: {reason}")]
    InvalidValue { arg: String, reason: String },

    #[error("path '{path}' does not exist")]
    PathNotFound { path: String },

    #[error("path '{path}' contains a path traversal segment")]
    PathTraversal { path: String },

    #[error("argument contains a forbidden character: {0:?}")]
    ForbiddenCharacter(char),

    #[error("failed to parse command line: {0}")]
    ClapError(#[from] clap::Error),
}

pub struct SecureArgParser;

impl SecureArgParser {
    /// Validates a string argument against the forbidden-character set.
    /// Used for values that do not name a filesystem path (pipeline names,
    /// session identifiers, output paths that don't exist yet).
    pub fn validate_argument(value: &str) -> Result<(), ParseError> {
        if let Some(c) = value.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
            return Err(ParseError::ForbiddenCharacter(c));
        }
        Ok(())
    }

    /// Validates and canonicalizes a path that must already exist: rejects
    /// `..` traversal segments and forbidden characters, then resolves
    /// symlinks via [`std::fs::canonicalize`].
    pub fn validate_path(value: &str) -> Result<PathBuf, ParseError> {
        Self::validate_argument(value)?;

        let path = PathBuf::from(value);
        if path.components().any(|c| c == std::path::Component::ParentDir) {
            return Err(ParseError::PathTraversal { path: value.to_string() });
        }

        std::fs::canonicalize(&path).map_err(|_| ParseError::PathNotFound { path: value.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_shell_metacharacters() {
        assert!(SecureArgParser::validate_argument("session; rm -rf /").is_err());
        assert!(SecureArgParser::validate_argument("normal-session-id").is_ok());
    }

    #[test]
    fn rejects_parent_dir_traversal() {
        assert!(matches!(
            SecureArgParser::validate_path("../../etc/passwd"),
            Err(ParseError::PathTraversal { .. })
        ));
    }

    #[test]
    fn rejects_nonexistent_path() {
        assert!(matches!(
            SecureArgParser::validate_path("/nonexistent/menu.jpg"),
            Err(ParseError::PathNotFound { .. })
        ));
    }
}
