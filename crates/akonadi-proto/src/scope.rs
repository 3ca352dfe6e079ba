use serde::{Deserialize, Serialize};

use crate::{Collection, Item, ScopeError, TagInfo};

/// Protocol reference to one or more entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "ids", rename_all = "snake_case")]
pub enum Scope {
    /// Server-assigned ids.
    Uid(Vec<i64>),
    /// Resource-side remote ids.
    Rid(Vec<String>),
    /// Global ids.
    Gid(Vec<String>),
}

/// Identifiers an entity can be addressed by.
pub trait ScopeEntity {
    /// Entity name used in error messages.
    const NAME: &'static str;

    fn uid(&self) -> Option<i64>;
    fn remote_id(&self) -> Option<&str>;
    fn gid(&self) -> Option<&str> {
        None
    }
}

impl ScopeEntity for Collection {
    const NAME: &'static str = "collection";

    fn uid(&self) -> Option<i64> {
        self.id.is_valid().then_some(self.id.0)
    }

    fn remote_id(&self) -> Option<&str> {
        non_empty(self.remote_id.as_deref())
    }
}

impl ScopeEntity for Item {
    const NAME: &'static str = "item";

    fn uid(&self) -> Option<i64> {
        self.id.is_valid().then_some(self.id.0)
    }

    fn remote_id(&self) -> Option<&str> {
        non_empty(self.remote_id.as_deref())
    }

    fn gid(&self) -> Option<&str> {
        non_empty(self.gid.as_deref())
    }
}

impl ScopeEntity for TagInfo {
    const NAME: &'static str = "tag";

    fn uid(&self) -> Option<i64> {
        self.id.is_valid().then_some(self.id.0)
    }

    fn remote_id(&self) -> Option<&str> {
        non_empty(self.remote_id.as_deref())
    }

    fn gid(&self) -> Option<&str> {
        non_empty(self.gid.as_deref())
    }
}

impl Scope {
    pub fn uid(id: i64) -> Self {
        Scope::Uid(vec![id])
    }

    /// Addresses a single entity by id, falling back to its remote id.
    pub fn from_entity<E: ScopeEntity>(entity: &E) -> Result<Self, ScopeError> {
        if let Some(uid) = entity.uid() {
            return Ok(Scope::Uid(vec![uid]));
        }
        if let Some(rid) = entity.remote_id() {
            return Ok(Scope::Rid(vec![rid.to_string()]));
        }
        Err(ScopeError::InvalidEntity { entity: E::NAME })
    }

    /// Addresses a set of entities by the first identifier kind all of them share.
    pub fn from_entities<E: ScopeEntity>(entities: &[E]) -> Result<Self, ScopeError> {
        if entities.is_empty() {
            return Err(ScopeError::Empty);
        }

        if let Some(uids) = entities.iter().map(ScopeEntity::uid).collect::<Option<Vec<_>>>() {
            return Ok(Scope::Uid(uids));
        }

        if let Some(rids) = entities
            .iter()
            .map(|entity| entity.remote_id().map(str::to_string))
            .collect::<Option<Vec<_>>>()
        {
            return Ok(Scope::Rid(rids));
        }

        if let Some(gids) = entities
            .iter()
            .map(|entity| entity.gid().map(str::to_string))
            .collect::<Option<Vec<_>>>()
        {
            return Ok(Scope::Gid(gids));
        }

        if entities.len() == 1 {
            return Err(ScopeError::InvalidEntity { entity: E::NAME });
        }
        Err(ScopeError::MixedIdentifiers)
    }

    pub fn len(&self) -> usize {
        match self {
            Scope::Uid(ids) => ids.len(),
            Scope::Rid(ids) | Scope::Gid(ids) => ids.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}
