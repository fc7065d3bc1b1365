#![allow(dead_code)]

use garde::Validate;
use jobtrack_data::{Entity, EntityMeta, Record, VersionedMeta};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Note {
    #[serde(flatten)]
    #[garde(skip)]
    pub meta: EntityMeta,
    #[garde(length(min = 1))]
    pub title: String,
    #[garde(skip)]
    pub tag: Option<String>,
    #[serde(default)]
    #[garde(skip)]
    pub score: i64,
}

impl Entity for Note {
    const NAME: &'static str = "note";

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Draft {
    #[serde(flatten)]
    #[garde(skip)]
    pub versioned: VersionedMeta,
    #[garde(skip)]
    pub body: String,
}

impl Entity for Draft {
    const NAME: &'static str = "draft";
    const VERSIONED: bool = true;

    fn meta(&self) -> &EntityMeta {
        &self.versioned.meta
    }
}

pub fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}
