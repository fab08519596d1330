//! Project version extraction from build descriptors.
//!
//! Maintenance branches carry their upcoming version in `gradle.properties`
//! (Gradle builds) or `pom.xml` (Maven builds). Milestones are titled after
//! that version with any snapshot qualifier removed.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{BackportError, Result};

pub const GRADLE_PROPERTIES: &str = "gradle.properties";
pub const POM_XML: &str = "pom.xml";

const SNAPSHOT_SUFFIXES: [&str; 2] = [".BUILD-SNAPSHOT", "-SNAPSHOT"];

/// Reads the `version` property of a Java properties file.
pub fn version_from_gradle_properties(content: &str) -> Option<String> {
    content
        .lines()
        .map(str::trim_start)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| {
            let split = line.find(|c: char| c == '=' || c == ':')?;
            Some((line[..split].trim(), line[split + 1..].trim()))
        })
        .find(|(key, _)| *key == "version")
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// Reads `/project/properties/revision`, falling back to `/project/version`.
pub fn version_from_pom(content: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(content.trim());
    reader.trim_text(true);

    let mut path: Vec<String> = Vec::new();
    let mut revision = None;
    let mut version = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                path.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Ok(Event::End(_)) => {
                path.pop();
            }
            Ok(Event::Text(ref t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| BackportError::ParseError(format!("Invalid {}: {}", POM_XML, e)))?;
                match path.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
                    ["project", "properties", "revision"] => revision = Some(text.trim().to_string()),
                    ["project", "version"] => version = Some(text.trim().to_string()),
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(BackportError::ParseError(format!(
                    "Invalid {} at position {}: {}",
                    POM_XML,
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(revision
        .filter(|v| !v.is_empty())
        .or(version)
        .filter(|v| !v.is_empty()))
}

/// Turns a project version into the milestone title it is released under.
pub fn milestone_title(version: &str) -> String {
    SNAPSHOT_SUFFIXES
        .iter()
        .fold(version.trim().to_string(), |v, suffix| v.replace(suffix, ""))
}
