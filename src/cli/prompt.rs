//! Interactive prompts for adding a package to the configuration

use std::io::{BufRead, Write};

use anyhow::{Result, bail};

use crate::config::PackageConfig;
use crate::package::types::Category;

/// A package entered at the prompt, ready for `TrackerConfig::add_package`
#[derive(Debug, Clone, PartialEq)]
pub struct NewPackage {
    pub name: String,
    pub config: PackageConfig,
    pub fast_moving: bool,
}

/// Print `prompt` and read one trimmed line; fails on end of input
pub fn ask<R: BufRead, W: Write>(prompt: &str, input: &mut R, output: &mut W) -> Result<String> {
    write!(output, "{}: ", prompt)?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        bail!("Input ended before {:?} was answered", prompt);
    }
    Ok(line.trim().to_string())
}

/// Like [`ask`], mapping an empty answer to `None`
pub fn ask_optional<R: BufRead, W: Write>(
    prompt: &str,
    input: &mut R,
    output: &mut W,
) -> Result<Option<String>> {
    let answer = ask(prompt, input, output)?;
    Ok((!answer.is_empty()).then_some(answer))
}

pub fn confirm<R: BufRead, W: Write>(prompt: &str, input: &mut R, output: &mut W) -> Result<bool> {
    write!(output, "{} [y/N] ", prompt)?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;

    let response = line.trim().to_lowercase();
    Ok(response == "y" || response == "yes")
}

/// Ask until the answer is a known category tag
pub fn ask_category<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<Category> {
    loop {
        let answer = ask("Category (e.g. frontend, backend, database)", input, output)?;
        match answer.parse::<Category>() {
            Ok(category) => return Ok(category),
            Err(e) => {
                let valid: Vec<&str> = Category::ALL.iter().map(Category::as_str).collect();
                writeln!(output, "{}. Valid categories: {}", e, valid.join(", "))?;
            }
        }
    }
}

/// Walk through every field of a new package
///
/// Returns `None` when the name is left empty.
pub fn prompt_new_package<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> Result<Option<NewPackage>> {
    writeln!(output, "Adding a new package to the configuration")?;

    let name = ask("Package name", input, output)?;
    if name.is_empty() {
        writeln!(output, "Package name is required")?;
        return Ok(None);
    }

    let display_name = ask_optional("Display name (optional)", input, output)?;
    let language = ask_optional("Language", input, output)?;
    let category = ask_category(input, output)?;
    let docs_url = ask("Documentation URL", input, output)?;
    let npm = ask_optional("npm package (optional)", input, output)?;
    let pypi = ask_optional("PyPI package (optional)", input, output)?;
    let github = ask_optional("GitHub repository owner/name (optional)", input, output)?;
    let fast_moving = confirm("Refresh daily as fast-moving?", input, output)?;

    if npm.is_none() && pypi.is_none() && github.is_none() {
        writeln!(
            output,
            "Warning: no source configured, {} will never produce a record",
            name
        )?;
    }

    Ok(Some(NewPackage {
        name,
        config: PackageConfig {
            display_name,
            language: language.unwrap_or_else(|| "Unknown".to_string()),
            category,
            docs_url,
            npm,
            pypi,
            github,
        },
        fast_moving,
    }))
}
