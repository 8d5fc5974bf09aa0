// dictionary.rs - FreeRADIUS-style text dictionary loader
//
// Grounded on examples/original_source/libradi/dictionary.py. The file
// format ($INCLUDE, VENDOR, BEGIN-VENDOR/END-VENDOR, ATTRIBUTE, VALUE) is
// unchanged; the registration semantics diverge from the literal Python in
// two places documented in DESIGN.md (vendor first-wins, $INCLUDE cycle
// dedup via canonicalized path).

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::types::TypeTag;

/// A `VENDOR` declaration: name, SMI Private Enterprise Number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vendor {
    pub name: String,
    pub number: u32,
}

/// One `ATTRIBUTE` declaration, plus any `VALUE` enumeration gathered for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDef {
    pub name: String,
    pub code: u32,
    pub type_tag: TypeTag,
    pub vendor: Option<String>,
    /// name -> wire value, populated by `VALUE` lines that reference this attribute.
    pub values: HashMap<String, u64>,
}

impl AttributeDef {
    /// Look up the wire value for a named enumeration constant.
    pub fn resolve_value(&self, name: &str) -> Option<u64> {
        self.values.get(name).copied()
    }
}

/// A fully loaded attribute/vendor catalog.
#[derive(Debug, Default)]
pub struct Dictionary {
    attributes: HashMap<String, Arc<AttributeDef>>,
    vendors: HashMap<String, Vendor>,
}

impl Dictionary {
    /// Load a dictionary rooted at `path`, following `$INCLUDE` directives.
    ///
    /// Matches `original_source/libradi/dictionary.py::read_dictionaries`,
    /// with two additions: `$INCLUDE` cycles are deduplicated by
    /// canonicalized path (the original has no such guard), and `VENDOR`
    /// registration is first-wins rather than last-wins (see DESIGN.md).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut dict = Dictionary::default();
        let mut seen = HashSet::new();
        let mut pending_values: Vec<(String, String, String)> = Vec::new();
        dict.read_one_file(path.as_ref(), &mut seen, &mut pending_values)?;

        for (attr_name, value_name, literal) in pending_values {
            let wire_value = crate::types::TypedValue::parse(TypeTag::Integer, &literal)
                .ok()
                .and_then(|v| match v {
                    crate::types::TypedValue::Numeric(n) => Some(n.value),
                    _ => None,
                })
                .ok_or_else(|| Error::ParseError {
                    type_tag: "integer",
                    literal: literal.clone(),
                    reason: "VALUE constant must be an integer literal".to_string(),
                })?;
            let def = Arc::get_mut(
                dict.attributes
                    .get_mut(&attr_name)
                    .ok_or_else(|| Error::UnknownDictionaryAttribute(attr_name.clone()))?,
            );
            match def {
                Some(def) => {
                    def.values.insert(value_name, wire_value);
                }
                None => {
                    // Another Arc clone already exists (shouldn't happen during
                    // loading, but guard against it defensively).
                    warn!(attr = %attr_name, "could not attach VALUE, attribute already shared");
                }
            }
        }

        info!(
            attributes = dict.attributes.len(),
            vendors = dict.vendors.len(),
            "dictionary loaded"
        );
        Ok(dict)
    }

    fn read_one_file(
        &mut self,
        path: &Path,
        seen: &mut HashSet<PathBuf>,
        pending_values: &mut Vec<(String, String, String)>,
    ) -> Result<()> {
        let canonical = fs::canonicalize(path).map_err(|source| Error::DictionaryIo {
            path: path.to_path_buf(),
            source,
        })?;
        if !seen.insert(canonical.clone()) {
            debug!(path = %path.display(), "skipping already-visited $INCLUDE");
            return Ok(());
        }

        let contents = fs::read_to_string(path).map_err(|source| Error::DictionaryIo {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

        let mut current_vendor: Option<String> = None;

        for raw_line in contents.lines() {
            let line = strip_comment(raw_line).trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();

            match fields[0] {
                "$INCLUDE" => {
                    if let Some(rel) = fields.get(1) {
                        let include_path = base_dir.join(rel);
                        self.read_one_file(&include_path, seen, pending_values)?;
                    }
                }
                "VENDOR" => {
                    if fields.len() >= 3 {
                        let name = fields[1].to_string();
                        if let Ok(number) = fields[2].parse::<u32>() {
                            // first-wins: see DESIGN.md
                            self.vendors.entry(name).or_insert(Vendor {
                                name: fields[1].to_string(),
                                number,
                            });
                        }
                    }
                }
                "BEGIN-VENDOR" => {
                    let name = fields.get(1).map(|s| s.to_string());
                    if let Some(ref name) = name {
                        if !self.vendors.contains_key(name) {
                            return Err(Error::UnknownVendor(name.clone()));
                        }
                    }
                    current_vendor = name;
                }
                "END-VENDOR" => {
                    current_vendor = None;
                }
                "ATTRIBUTE" => {
                    if fields.len() >= 4 {
                        let name = fields[1].to_string();
                        let code: u32 = fields[2].parse().unwrap_or(0);
                        let type_tag = TypeTag::from_str(fields[3]).ok_or_else(|| {
                            Error::UnknownType {
                                attr: name.clone(),
                                type_tag: fields[3].to_string(),
                            }
                        })?;
                        // last-wins, matching the original
                        self.attributes.insert(
                            name.clone(),
                            Arc::new(AttributeDef {
                                name,
                                code,
                                type_tag,
                                vendor: current_vendor.clone(),
                                values: HashMap::new(),
                            }),
                        );
                    }
                }
                "VALUE" => {
                    if fields.len() >= 4 {
                        pending_values.push((
                            fields[1].to_string(),
                            fields[2].to_string(),
                            fields[3].to_string(),
                        ));
                    }
                }
                _ => {
                    debug!(line = %line, "ignoring unrecognized dictionary directive");
                }
            }
        }
        Ok(())
    }

    /// Look up an attribute by its dictionary name.
    pub fn attribute(&self, name: &str) -> Result<Arc<AttributeDef>> {
        self.attributes
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownAttribute(name.to_string()))
    }

    /// Look up a vendor by its dictionary name.
    pub fn vendor(&self, name: &str) -> Result<&Vendor> {
        self.vendors.get(name).ok_or_else(|| Error::UnknownVendor(name.to_string()))
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    pub fn vendor_count(&self) -> usize {
        self.vendors.len()
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_fixture(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_attributes_and_values() {
        let dir = tempdir();
        write_fixture(
            &dir,
            "dictionary",
            "ATTRIBUTE User-Name 1 string\nATTRIBUTE Acct-Status-Type 40 integer\nVALUE Acct-Status-Type Start 1\nVALUE Acct-Status-Type Stop 2\n",
        );
        let dict = Dictionary::load(dir.join("dictionary")).unwrap();
        assert_eq!(dict.attribute_count(), 2);
        let attr = dict.attribute("Acct-Status-Type").unwrap();
        assert_eq!(attr.resolve_value("Start"), Some(1));
        assert_eq!(attr.resolve_value("Stop"), Some(2));
    }

    #[test]
    fn resolves_include_directives() {
        let dir = tempdir();
        write_fixture(&dir, "extra", "ATTRIBUTE Framed-Protocol 7 integer\n");
        write_fixture(
            &dir,
            "dictionary",
            "ATTRIBUTE User-Name 1 string\n$INCLUDE extra\n",
        );
        let dict = Dictionary::load(dir.join("dictionary")).unwrap();
        assert_eq!(dict.attribute_count(), 2);
        assert!(dict.attribute("Framed-Protocol").is_ok());
    }

    #[test]
    fn include_cycles_are_deduplicated() {
        let dir = tempdir();
        write_fixture(&dir, "a", "$INCLUDE b\nATTRIBUTE Alpha 1 integer\n");
        write_fixture(&dir, "b", "$INCLUDE a\nATTRIBUTE Beta 2 integer\n");
        let dict = Dictionary::load(dir.join("a")).unwrap();
        assert_eq!(dict.attribute_count(), 2);
    }

    #[test]
    fn vendor_registration_is_first_wins() {
        let dir = tempdir();
        write_fixture(
            &dir,
            "dictionary",
            "VENDOR Example 1000\nVENDOR Example 2000\n",
        );
        let dict = Dictionary::load(dir.join("dictionary")).unwrap();
        assert_eq!(dict.vendor("Example").unwrap().number, 1000);
    }

    #[test]
    fn begin_vendor_requires_prior_registration() {
        let dir = tempdir();
        write_fixture(
            &dir,
            "dictionary",
            "BEGIN-VENDOR Ghost\nATTRIBUTE Foo 1 integer\nEND-VENDOR\n",
        );
        let result = Dictionary::load(dir.join("dictionary"));
        assert!(result.is_err());
    }

    #[test]
    fn attribute_within_vendor_block_records_vendor() {
        let dir = tempdir();
        write_fixture(
            &dir,
            "dictionary",
            "VENDOR Example 1000\nBEGIN-VENDOR Example\nATTRIBUTE Example-Attr 1 integer\nEND-VENDOR\n",
        );
        let dict = Dictionary::load(dir.join("dictionary")).unwrap();
        let attr = dict.attribute("Example-Attr").unwrap();
        assert_eq!(attr.vendor.as_deref(), Some("Example"));
    }

    #[test]
    fn unknown_type_tag_is_an_error() {
        let dir = tempdir();
        write_fixture(&dir, "dictionary", "ATTRIBUTE Weird 1 bogus\n");
        assert!(Dictionary::load(dir.join("dictionary")).is_err());
    }

    fn tempdir() -> PathBuf {
        let mut dir = std::env::temp_dir();
        let unique = format!(
            "rad-acct-test-{}-{:p}",
            std::process::id(),
            &dir as *const _
        );
        dir.push(unique);
        fs::create_dir_all(&dir).unwrap();
        dir
    }
}
