//! Per-device mapping documents
//!
//! One XML document per configured controller:
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <inputConfig deviceName="8BitDo Pro 2" deviceGUID="05000000c82d..." deviceNbAxes="6" deviceNbHats="1" deviceNbButtons="15">
//!   <input name="a" type="button" id="1" value="1" code="305"/>
//!   <input name="joystick1left" type="axis" id="0" value="-1" code="0"/>
//! </inputConfig>
//! ```
//!
//! Documents live in one directory (the [`MappingLibrary`]) and are matched
//! to devices by GUID and name, falling back to name only.

use anyhow::{anyhow, Context, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::device::{Device, DeviceIdentity};
use super::entry::LogicalEntry;
use super::error::InputError;
use super::raw::{RawKind, RawPattern};

const ROOT_TAG: &[u8] = b"inputConfig";
const INPUT_TAG: &[u8] = b"input";

/// Saved mapping table of one device model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingDocument {
    pub name: String,
    pub guid: String,
    pub axis_count: usize,
    pub hat_count: usize,
    pub button_count: usize,
    /// Bindings in document order
    pub inputs: Vec<(LogicalEntry, RawPattern)>,
}

impl MappingDocument {
    /// Snapshot the mapping table of `device`
    pub fn from_device(device: &Device) -> Self {
        Self {
            name: device.name().to_string(),
            guid: device.guid().to_string(),
            axis_count: device.axis_count(),
            hat_count: device.hat_count(),
            button_count: device.button_count(),
            inputs: device.patterns().map(|(e, p)| (e, *p)).collect(),
        }
    }

    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity::new(self.name.clone(), self.guid.clone())
    }

    /// Replace the mapping table of `device` with this document's bindings
    pub fn apply(&self, device: &mut Device) {
        device.clear_mapping();
        for (entry, pattern) in &self.inputs {
            device.set_pattern(*entry, *pattern);
        }
    }

    /// Parse a document
    ///
    /// Root-level problems fail the whole document; a bad `<input>` element
    /// is logged and skipped.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);
        let mut buf = Vec::new();
        let mut document: Option<MappingDocument> = None;

        loop {
            match reader
                .read_event_into(&mut buf)
                .map_err(|e| anyhow!("{e:?}"))?
            {
                Event::Start(element) | Event::Empty(element) => {
                    let name = element.name();
                    match name.as_ref() {
                        ROOT_TAG if document.is_none() => {
                            document = Some(parse_root(&element)?);
                        }
                        INPUT_TAG => match document.as_mut() {
                            Some(doc) => match parse_input(&element) {
                                Ok(binding) => doc.inputs.push(binding),
                                Err(e) => warn!("Skipping input of '{}': {:#}", doc.name, e),
                            },
                            None => warn!("Ignoring <input> outside <inputConfig>"),
                        },
                        _ => {}
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        let mut document = document.ok_or_else(|| anyhow!("no <inputConfig> element"))?;
        document.mirror_single_direction_sticks();
        Ok(document)
    }

    /// Serialize as an XML document
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut root = BytesStart::new("inputConfig");
        root.push_attribute(("deviceName", self.name.as_str()));
        root.push_attribute(("deviceGUID", self.guid.as_str()));
        root.push_attribute(("deviceNbAxes", self.axis_count.to_string().as_str()));
        root.push_attribute(("deviceNbHats", self.hat_count.to_string().as_str()));
        root.push_attribute(("deviceNbButtons", self.button_count.to_string().as_str()));
        writer.write_event(Event::Start(root))?;

        for (entry, pattern) in &self.inputs {
            let mut input = BytesStart::new("input");
            input.push_attribute(("name", entry.name()));
            input.push_attribute(("type", pattern.kind.as_str()));
            input.push_attribute(("id", pattern.id.to_string().as_str()));
            input.push_attribute(("value", pattern.value.to_string().as_str()));
            input.push_attribute(("code", pattern.code.to_string().as_str()));
            writer.write_event(Event::Empty(input))?;
        }

        writer.write_event(Event::End(BytesEnd::new("inputConfig")))?;
        String::from_utf8(writer.into_inner().into_inner()).context("Mapping document is not UTF-8")
    }

    /// Older documents stored one direction per stick axis
    fn mirror_single_direction_sticks(&mut self) {
        let mut mirrored = Vec::new();
        for (entry, pattern) in &self.inputs {
            let Some(opposite) = entry.opposite() else {
                continue;
            };
            if entry.is_dpad() || self.inputs.iter().any(|(e, _)| *e == opposite) {
                continue;
            }
            if let Some(reversed) = pattern.reversed() {
                debug!("Mirroring {} to {} for '{}'", entry, opposite, self.name);
                mirrored.push((opposite, reversed));
            }
        }
        self.inputs.extend(mirrored);
    }
}

/// Attributes of an element as `(key, unescaped value)` pairs
fn attributes(element: &BytesStart<'_>) -> Result<Vec<(Vec<u8>, String)>> {
    let mut out = Vec::new();
    for attr in element.attributes().with_checks(false) {
        let attr = attr?;
        let value = attr.unescape_value()?.trim().to_string();
        out.push((attr.key.as_ref().to_vec(), value));
    }
    Ok(out)
}

fn number<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, InputError> {
    value.parse().map_err(|_| InputError::InvalidAttribute {
        name,
        value: value.to_string(),
    })
}

fn parse_root(element: &BytesStart<'_>) -> Result<MappingDocument> {
    let mut document = MappingDocument {
        name: String::new(),
        guid: String::new(),
        axis_count: 0,
        hat_count: 0,
        button_count: 0,
        inputs: Vec::new(),
    };
    let mut has_name = false;

    for (key, value) in attributes(element)? {
        match key.as_slice() {
            b"deviceName" => {
                document.name = value;
                has_name = true;
            }
            b"deviceGUID" => document.guid = value,
            b"deviceNbAxes" => document.axis_count = number("deviceNbAxes", &value)?,
            b"deviceNbHats" => document.hat_count = number("deviceNbHats", &value)?,
            b"deviceNbButtons" => document.button_count = number("deviceNbButtons", &value)?,
            _ => {}
        }
    }

    if !has_name {
        return Err(InputError::MissingAttribute("deviceName").into());
    }
    Ok(document)
}

fn parse_input(element: &BytesStart<'_>) -> Result<(LogicalEntry, RawPattern)> {
    let mut entry = None;
    let mut kind = None;
    let mut id = None;
    let mut value: Option<i32> = None;
    let mut code = 0;

    for (key, text) in attributes(element)? {
        match key.as_slice() {
            b"name" => {
                entry = Some(LogicalEntry::from_name(&text).ok_or(InputError::UnknownEntry(text))?)
            }
            b"type" => kind = Some(RawKind::parse(&text)?),
            b"id" => id = Some(number("id", &text)?),
            b"value" => value = Some(number("value", &text)?),
            b"code" => code = number("code", &text)?,
            _ => {}
        }
    }

    let entry = entry.ok_or(InputError::MissingAttribute("name"))?;
    let kind = kind.ok_or(InputError::MissingAttribute("type"))?;
    let id = id.ok_or(InputError::MissingAttribute("id"))?;
    let value = value.ok_or(InputError::MissingAttribute("value"))?;
    // Axis and wheel patterns only carry a direction
    let value = match kind {
        RawKind::Axis | RawKind::MouseWheel => value.signum(),
        _ => value,
    };
    let pattern = RawPattern {
        code,
        ..RawPattern::new(kind, id, value)
    };
    Ok((entry, pattern))
}

/// Directory of mapping documents
#[derive(Debug, Clone, Default)]
pub struct MappingLibrary {
    dir: PathBuf,
    documents: Vec<MappingDocument>,
}

impl MappingLibrary {
    /// Empty library writing into `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            documents: Vec::new(),
        }
    }

    /// Load every `*.xml` document of `dir`
    ///
    /// A missing directory is an empty library. Unreadable documents are
    /// logged and skipped.
    ///
    /// # Arguments
    /// * `dir` - Mapping directory
    pub fn load(dir: impl Into<PathBuf>) -> Result<Self> {
        let mut library = Self::new(dir);
        if !library.dir.exists() {
            debug!("Mapping directory {} does not exist yet", library.dir.display());
            return Ok(library);
        }

        let read_dir = std::fs::read_dir(&library.dir)
            .with_context(|| format!("Failed to list mapping directory: {}", library.dir.display()))?;
        let mut paths: Vec<PathBuf> = read_dir
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "xml"))
            .collect();
        paths.sort();

        for path in paths {
            match read_document(&path) {
                Ok(document) => library.documents.push(document),
                Err(e) => warn!("⚠️  Skipping mapping document {}: {:#}", path.display(), e),
            }
        }

        info!(
            "📂 Loaded {} mapping documents from {}",
            library.documents.len(),
            library.dir.display()
        );
        Ok(library)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn documents(&self) -> &[MappingDocument] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Document for `identity`: exact name+GUID first, then same name
    pub fn find(&self, identity: &DeviceIdentity) -> Option<&MappingDocument> {
        self.documents
            .iter()
            .find(|d| d.name == identity.name && d.guid == identity.guid)
            .or_else(|| self.documents.iter().find(|d| d.name == identity.name))
    }

    /// Store `document`, replacing any with the same name and GUID
    ///
    /// # Returns
    /// Path of the written file
    pub fn save(&mut self, document: MappingDocument) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create mapping directory: {}", self.dir.display()))?;

        let path = self.dir.join(file_name(&document));
        let xml = document.to_xml()?;
        std::fs::write(&path, xml)
            .with_context(|| format!("Failed to write mapping document: {}", path.display()))?;

        match self
            .documents
            .iter_mut()
            .find(|d| d.name == document.name && d.guid == document.guid)
        {
            Some(existing) => *existing = document,
            None => self.documents.push(document),
        }

        info!("💾 Saved mapping document {}", path.display());
        Ok(path)
    }
}

fn read_document(path: &Path) -> Result<MappingDocument> {
    let xml = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    MappingDocument::parse(&xml)
}

/// `<name>-<guid>.xml` with anything outside `[A-Za-z0-9]` replaced
fn file_name(document: &MappingDocument) -> String {
    let clean = |s: &str| -> String {
        s.chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect()
    };
    if document.guid.is_empty() {
        format!("{}.xml", clean(&document.name))
    } else {
        format!("{}-{}.xml", clean(&document.name), clean(&document.guid))
    }
}
