//! Purpose: Extract audience-targeting criteria from a submitted document.
//! Exports: `SendCriteria`.
//! Role: First pass of envelope construction; shape errors here are fatal.
//! Invariants: Absent (or JSON null) keys stay unset; no scalar is coerced
//! into a one-element list.
//! Invariants: Element order and duplicates are preserved as submitted.

use crate::core::error::Error;
use serde_json::{Map, Value};

/// Audience selector read from the top level of a send request.
///
/// Each field mirrors one top-level key (`alias`, `deviceType`,
/// `categories`, `variants`). `None` means the key was not supplied, which
/// downstream resolution treats as "no restriction" for that dimension.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SendCriteria {
    aliases: Option<Vec<String>>,
    device_types: Option<Vec<String>>,
    categories: Option<Vec<String>>,
    variants: Option<Vec<String>>,
}

impl SendCriteria {
    /// Reads the four criteria keys out of the top-level document.
    ///
    /// A present key must hold an array of strings; anything else is a
    /// `TypeMismatch` naming the key, and the whole parse is abandoned.
    pub fn from_document(document: &Map<String, Value>) -> Result<Self, Error> {
        Ok(Self {
            aliases: string_list(document, "alias")?,
            device_types: string_list(document, "deviceType")?,
            categories: string_list(document, "categories")?,
            variants: string_list(document, "variants")?,
        })
    }

    pub fn aliases(&self) -> Option<&[String]> {
        self.aliases.as_deref()
    }

    pub fn device_types(&self) -> Option<&[String]> {
        self.device_types.as_deref()
    }

    pub fn categories(&self) -> Option<&[String]> {
        self.categories.as_deref()
    }

    pub fn variants(&self) -> Option<&[String]> {
        self.variants.as_deref()
    }
}

fn string_list(document: &Map<String, Value>, key: &str) -> Result<Option<Vec<String>>, Error> {
    match document.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(value) => out.push(value.clone()),
                    _ => return Err(Error::type_mismatch(key, "an array of strings")),
                }
            }
            Ok(Some(out))
        }
        Some(_) => Err(Error::type_mismatch(key, "an array of strings")),
    }
}
