use garde::Validate;
use jobtrack_data::{Entity, EntityMeta};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct User {
    #[serde(flatten)]
    #[garde(skip)]
    pub meta: EntityMeta,
    #[garde(length(min = 1, max = 200))]
    pub name: String,
}

impl Entity for User {
    const NAME: &'static str = "user";

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }
}
