// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Parsing of the repository list file.
//!
//! The file holds one `owner/repo` pair per line. Blank lines and `#`
//! comments are ignored, and repeated entries collapse onto the first
//! occurrence so a repository is never reported twice in one batch.

use std::{
    collections::HashSet,
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
    sync::LazyLock,
};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{self, Error};

static NAME_PATTERN: LazyLock<Result<Regex, regex::Error,>,> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$",),);

/// Repository identified by its owner (user or organization) and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize,)]
pub struct RepositoryRef
{
    /// Account that owns the repository.
    pub owner: String,
    /// Repository name.
    pub name:  String,
}

impl RepositoryRef
{
    /// Builds a repository reference after validating both components.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when either component is empty, `.` or
    /// `..`, or contains characters GitHub does not allow.
    pub fn new(owner: &str, name: &str,) -> Result<Self, Error,>
    {
        Ok(Self {
            owner: validate_component(owner, "owner",)?,
            name:  validate_component(name, "repository",)?,
        },)
    }

    /// Output prefix for this repository inside `output_dir`:
    /// `<output_dir>/<owner>/<name>`.
    pub fn output_prefix(&self, output_dir: &Path,) -> PathBuf
    {
        output_dir.join(&self.owner,).join(&self.name,)
    }

    fn dedup_key(&self,) -> (String, String,)
    {
        (self.owner.to_ascii_lowercase(), self.name.to_ascii_lowercase(),)
    }
}

impl fmt::Display for RepositoryRef
{
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result
    {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepositoryRef
{
    type Err = Error;

    fn from_str(value: &str,) -> Result<Self, Self::Err,>
    {
        let trimmed = value.trim();
        let (owner, name,) = trimmed.split_once('/',).ok_or_else(|| {
            Error::validation(format!("expected 'owner/repo', got '{trimmed}'"),)
        },)?;
        if name.contains('/',) {
            return Err(Error::validation(format!("expected 'owner/repo', got '{trimmed}'"),),);
        }
        Self::new(owner, name,)
    }
}

/// Loads and parses a repository list file.
///
/// # Errors
///
/// Returns [`Error::Io`] when the file cannot be read and
/// [`Error::Validation`] when a line is malformed or no repository remains.
pub fn load_repository_list(path: &Path,) -> Result<Vec<RepositoryRef,>, Error,>
{
    let contents = fs::read_to_string(path,).map_err(|source| error::io_error(path, source,),)?;
    parse_repository_list(&contents,)
}

/// Parses repository list contents.
///
/// # Errors
///
/// Returns [`Error::Validation`] naming the 1-based line of the first
/// malformed entry, or when the list is empty after comments are removed.
///
/// # Examples
///
/// ```
/// use gha_report::parse_repository_list;
///
/// let repos = parse_repository_list("# platform\noctocat/hello-world\nocto/ci  # nightly\n",)?;
/// assert_eq!(repos.len(), 2);
/// assert_eq!(repos[1].to_string(), "octo/ci");
/// # Ok::<(), gha_report::Error>(())
/// ```
pub fn parse_repository_list(contents: &str,) -> Result<Vec<RepositoryRef,>, Error,>
{
    let mut repositories = Vec::new();
    let mut seen = HashSet::new();

    for (index, raw_line,) in contents.lines().enumerate() {
        let line = raw_line.split_once('#',).map_or(raw_line, |(before, _,)| before,).trim();
        if line.is_empty() {
            continue;
        }

        let repository = line.parse::<RepositoryRef,>().map_err(|error| match error {
            Error::Validation {
                message,
            } => Error::validation(format!("line {}: {message}", index + 1),),
            other => other,
        },)?;

        if seen.insert(repository.dedup_key(),) {
            repositories.push(repository,);
        } else {
            debug!("Skipping duplicate repository {} on line {}", repository, index + 1);
        }
    }

    if repositories.is_empty() {
        return Err(Error::validation("repository list must include at least one repository",),);
    }

    Ok(repositories,)
}

fn validate_component(input: &str, field: &str,) -> Result<String, Error,>
{
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(format!("{field} must not be empty"),),);
    }
    if trimmed == "." || trimmed == ".." {
        return Err(Error::validation(format!("{field} '{trimmed}' is not a valid name"),),);
    }
    let pattern = NAME_PATTERN
        .as_ref()
        .map_err(|e| Error::validation(format!("invalid name pattern: {e}"),),)?;
    if !pattern.is_match(trimmed,) {
        return Err(Error::validation(format!(
            "{field} '{trimmed}' may only contain letters, digits, '-', '_' and '.'"
        ),),);
    }
    Ok(trimmed.to_owned(),)
}

#[cfg(test)]
mod tests
{
    use std::path::Path;

    use proptest::prelude::*;

    use super::{RepositoryRef, parse_repository_list};
    use crate::Error;

    proptest! {
        #[test]
        fn well_formed_lines_parse_back_to_their_components(
            owner in "[A-Za-z0-9][A-Za-z0-9-]{0,20}",
            name in "[A-Za-z0-9_-][A-Za-z0-9_.-]{0,30}",
        ) {
            let line = format!("  {owner}/{name}  ");
            let repos = parse_repository_list(&line).expect("line should parse");
            prop_assert_eq!(repos.len(), 1);
            prop_assert_eq!(&repos[0].owner, &owner);
            prop_assert_eq!(&repos[0].name, &name);
        }
    }

    #[test]
    fn skips_comments_and_blank_lines()
    {
        let contents = concat!(
            "\n# team A\noctocat/hello-world\n\n",
            "   # indented comment\nocto-org/ci.tools # trailing\n",
        );
        let repos = parse_repository_list(contents,).expect("valid list",);

        assert_eq!(repos, vec![
            RepositoryRef {
                owner: "octocat".to_owned(), name: "hello-world".to_owned(),
            },
            RepositoryRef {
                owner: "octo-org".to_owned(), name: "ci.tools".to_owned(),
            },
        ]);
    }

    #[test]
    fn drops_case_insensitive_duplicates_keeping_first()
    {
        let repos =
            parse_repository_list("Octo/Repo\nocto/repo\nocto/other\n",).expect("valid list",);
        assert_eq!(repos.len(), 2);
        assert_eq!(repos[0].to_string(), "Octo/Repo");
        assert_eq!(repos[1].to_string(), "octo/other");
    }

    #[test]
    fn reports_line_number_of_malformed_entry()
    {
        let error =
            parse_repository_list("octo/repo\njust-a-name\n",).expect_err("expected failure",);
        match error {
            Error::Validation {
                message,
            } => {
                assert!(message.starts_with("line 2:"), "unexpected message: {message}");
                assert!(message.contains("owner/repo"));
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[test]
    fn rejects_extra_path_segments_and_bad_characters()
    {
        assert!(parse_repository_list("octo/repo/extra\n").is_err());
        assert!(parse_repository_list("octo/re po\n").is_err());
        assert!(parse_repository_list("octo/..\n").is_err());
        assert!(parse_repository_list("/repo\n").is_err());
    }

    #[test]
    fn rejects_empty_list()
    {
        let error = parse_repository_list("# nothing here\n\n",).expect_err("expected failure",);
        assert!(error.to_string().contains("at least one repository"));
    }

    #[test]
    fn output_prefix_nests_owner_and_name()
    {
        let repo: RepositoryRef = "octo/hello".parse().expect("valid reference",);
        assert_eq!(repo.output_prefix(Path::new("reports",),), Path::new("reports/octo/hello"));
    }
}
