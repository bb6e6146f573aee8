use serde::{Deserialize, Deserializer, Serialize, Serializer, de::DeserializeOwned};
use serde_json::{Number, Value};
use std::{collections::BTreeSet, fmt};
use utoipa::ToSchema;

use crate::error::AuthError;

// --- Actions ---

/// AuthorizedAction
///
/// The verbs a permission can grant. Encoded on the wire as the integer codes
/// `1..=5`, which is the format already present in issued tokens.
///
/// Anything that is not plain CRUD is `Other`; the concrete action then lives in
/// the resource type, e.g. `"auth/session:refresh"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AuthorizedAction {
    Create = 1,
    Delete = 2,
    Modify = 3,
    Query = 4,
    Other = 5,
}

impl AuthorizedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorizedAction::Create => "create",
            AuthorizedAction::Delete => "delete",
            AuthorizedAction::Modify => "modify",
            AuthorizedAction::Query => "query",
            AuthorizedAction::Other => "other",
        }
    }
}

impl From<AuthorizedAction> for u8 {
    fn from(action: AuthorizedAction) -> u8 {
        action as u8
    }
}

impl TryFrom<u8> for AuthorizedAction {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(AuthorizedAction::Create),
            2 => Ok(AuthorizedAction::Delete),
            3 => Ok(AuthorizedAction::Modify),
            4 => Ok(AuthorizedAction::Query),
            5 => Ok(AuthorizedAction::Other),
            other => Err(format!("unknown authorized action code {other}")),
        }
    }
}

impl fmt::Display for AuthorizedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Filter dimensions ---

/// Scope
///
/// One dimension of an `AuthorizedResource` filter.
///
/// `Any` is the wildcard: it matches regardless of the attribute, including
/// resources that do not have it at all. `Only(v)` restricts the dimension to `v`.
/// An `Only` holding an empty set therefore matches nothing.
///
/// On the wire `Any` is `null` and `Only(v)` is `v`. The key itself must be
/// present; a missing key is a shape error, never an implicit wildcard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope<T> {
    Any,
    Only(T),
}

impl<T> Scope<T> {
    pub fn is_any(&self) -> bool {
        matches!(self, Scope::Any)
    }

    /// True when the dimension is a wildcard or `accepts` holds for the restriction.
    fn admits(&self, accepts: impl FnOnce(&T) -> bool) -> bool {
        match self {
            Scope::Any => true,
            Scope::Only(restriction) => accepts(restriction),
        }
    }
}

impl<T: Serialize> Serialize for Scope<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Scope::Any => serializer.serialize_none(),
            Scope::Only(value) => serializer.serialize_some(value),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Scope<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Going through `Value` (deserialize_any) keeps a missing key an error.
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(Scope::Any),
            value => T::deserialize(value)
                .map(Scope::Only)
                .map_err(serde::de::Error::custom),
        }
    }
}

// --- Audited resource ---

/// ResourceKey
///
/// An owner or resource id as supplied by a caller. Ids are integers; any other
/// number is kept only so it can be reported, and never equals a granted id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKey {
    Integer(i64),
    Unmatched(Number),
}

impl ResourceKey {
    /// Classifies a JSON number. Integral values within `i64` range (`1`, `1.0`)
    /// become `Integer`; fractions and out-of-range values are `Unmatched`.
    pub fn from_number(number: &Number) -> Self {
        if let Some(integer) = number.as_i64() {
            return ResourceKey::Integer(integer);
        }
        match number.as_f64() {
            // i64::MAX as f64 rounds up to 2^63, hence the exclusive bound.
            Some(float)
                if float.fract() == 0.0 && float >= i64::MIN as f64 && float < i64::MAX as f64 =>
            {
                ResourceKey::Integer(float as i64)
            }
            _ => ResourceKey::Unmatched(number.clone()),
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ResourceKey::Integer(integer) => Some(*integer),
            ResourceKey::Unmatched(_) => None,
        }
    }
}

impl From<i64> for ResourceKey {
    fn from(integer: i64) -> Self {
        ResourceKey::Integer(integer)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKey::Integer(integer) => write!(f, "{integer}"),
            ResourceKey::Unmatched(number) => write!(f, "{number}"),
        }
    }
}

/// ResourceRef
///
/// The resource a request wants to act on. `None` in any field means the
/// resource genuinely has no owner, type or id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceRef {
    pub owner_id: Option<ResourceKey>,
    pub resource_type: Option<String>,
    pub resource_id: Option<ResourceKey>,
}

impl ResourceRef {
    pub fn new(owner_id: Option<i64>, resource_type: Option<&str>, resource_id: Option<i64>) -> Self {
        Self {
            owner_id: owner_id.map(ResourceKey::from),
            resource_type: resource_type.map(str::to_owned),
            resource_id: resource_id.map(ResourceKey::from),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn or_null<T: fmt::Display>(value: &Option<T>) -> String {
            value
                .as_ref()
                .map_or_else(|| "null".to_string(), ToString::to_string)
        }

        write!(
            f,
            "resourceOwnerId: {}, resourceType: {}, resourceId: {}",
            or_null(&self.owner_id),
            or_null(&self.resource_type),
            or_null(&self.resource_id),
        )
    }
}

// --- Grants ---

/// AuthorizedResource
///
/// A three-dimensional filter describing which resources a permission covers.
///
/// ```text
/// { ownedByUser: null, types: null,      resourceIds: null }      every resource, owned or not
/// { ownedByUser: 123,  types: null,      resourceIds: null }      everything user 123 owns
/// { ownedByUser: 123,  types: ["users/profile"], ... null }       the profile of user 123
/// { ownedByUser: null, types: ["blog"],  resourceIds: [42, 95] }  blogs 42 and 95
/// { ownedByUser: null, types: [],        resourceIds: null }      nothing at all
/// ```
///
/// Set members may be `null`; such a set also matches a request whose attribute is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizedResource {
    #[schema(value_type = Option<i64>)]
    pub owned_by_user: Scope<i64>,
    #[schema(value_type = Option<Vec<String>>)]
    pub types: Scope<BTreeSet<Option<String>>>,
    #[schema(value_type = Option<Vec<i64>>)]
    pub resource_ids: Scope<BTreeSet<Option<i64>>>,
    /// Reserved; carried through tokens untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub data: Option<Value>,
}

impl AuthorizedResource {
    /// A filter that matches every resource. Grant it sparingly.
    pub fn any() -> Self {
        Self {
            owned_by_user: Scope::Any,
            types: Scope::Any,
            resource_ids: Scope::Any,
            data: None,
        }
    }

    pub fn owned_by(user_id: i64) -> Self {
        Self {
            owned_by_user: Scope::Only(user_id),
            ..Self::any()
        }
    }

    /// Restricts the type dimension. An empty iterator yields a filter that matches nothing.
    pub fn with_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types = Scope::Only(types.into_iter().map(|t| Some(t.into())).collect());
        self
    }

    pub fn with_ids(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.resource_ids = Scope::Only(ids.into_iter().map(Some).collect());
        self
    }

    pub fn matches(&self, resource: &ResourceRef) -> bool {
        let owner_matches = self.owned_by_user.admits(|owner| {
            resource.owner_id.as_ref().and_then(ResourceKey::as_integer) == Some(*owner)
        });
        let type_matches = self.types.admits(|types| {
            types
                .iter()
                .any(|t| t.as_deref() == resource.resource_type.as_deref())
        });
        let id_matches = self.resource_ids.admits(|ids| match &resource.resource_id {
            None => ids.contains(&None),
            Some(key) => key.as_integer().is_some_and(|id| ids.contains(&Some(id))),
        });

        owner_matches && type_matches && id_matches
    }
}

/// Permission
///
/// Grants every action in `authorized_actions` on every resource matched by
/// `authorized_resource`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    #[serde(deserialize_with = "non_empty_actions")]
    #[schema(value_type = Vec<u8>)]
    pub authorized_actions: BTreeSet<AuthorizedAction>,
    pub authorized_resource: AuthorizedResource,
}

impl Permission {
    pub fn new(
        actions: impl IntoIterator<Item = AuthorizedAction>,
        resource: AuthorizedResource,
    ) -> Self {
        Self {
            authorized_actions: actions.into_iter().collect(),
            authorized_resource: resource,
        }
    }

    pub fn permits(&self, action: AuthorizedAction, resource: &ResourceRef) -> bool {
        self.authorized_actions.contains(&action) && self.authorized_resource.matches(resource)
    }
}

/// A permission that grants no action is a malformed grant, not a no-op.
fn non_empty_actions<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeSet<AuthorizedAction>, D::Error> {
    let actions = BTreeSet::<AuthorizedAction>::deserialize(deserializer)?;
    if actions.is_empty() {
        return Err(serde::de::Error::invalid_length(0, &"at least one authorized action"));
    }
    Ok(actions)
}

/// Authorization
///
/// The permissions granted to the identity `user_id`. This is the whole session
/// state: it only ever exists inside a signed token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Authorization {
    pub user_id: i64,
    pub permissions: Vec<Permission>,
}

impl Authorization {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            permissions: Vec::new(),
        }
    }

    pub fn grant(
        mut self,
        actions: impl IntoIterator<Item = AuthorizedAction>,
        resource: AuthorizedResource,
    ) -> Self {
        self.permissions.push(Permission::new(actions, resource));
        self
    }

    /// Existential over the permission list; stops at the first match.
    pub fn permits(&self, action: AuthorizedAction, resource: &ResourceRef) -> bool {
        self.permissions.iter().any(|p| p.permits(action, resource))
    }

    pub fn audit(&self, action: AuthorizedAction, resource: &ResourceRef) -> Result<(), AuthError> {
        if self.permits(action, resource) {
            Ok(())
        } else {
            Err(AuthError::PermissionDenied {
                action,
                resource: resource.clone(),
            })
        }
    }
}

/// TokenPayload
///
/// The claims carried by a token. `valid_until` is epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPayload {
    pub authorization: Authorization,
    pub valid_until: i64,
}

// --- Request / Response Payloads ---

/// AuditRequest
///
/// Body of `POST /auth/audit`. Owner and id are taken as raw JSON so that a
/// caller passing a non-numeric value is reported as a usage fault.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditRequest {
    #[schema(value_type = u8)]
    pub action: AuthorizedAction,
    #[serde(default)]
    #[schema(value_type = Option<i64>)]
    pub resource_owner_id: Value,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<i64>)]
    pub resource_id: Value,
}

/// RefreshResponse
///
/// Returned by `POST /auth/session/refresh`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

/// ErrorResponse
///
/// The JSON body sent for every `AuthError`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: u16,
    pub name: String,
    pub message: String,
}
