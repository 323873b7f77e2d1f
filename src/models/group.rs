use std::fmt;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use super::patient::PatientId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Group as persisted by the group management layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: GroupId,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default = "default_group_type")]
    pub group_type: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub members: Vec<GroupMember>,
    pub created_at: Option<DateTime<Utc>>,
}

fn default_group_type() -> String {
    "general".to_string()
}

/// A member reference, stored as a bare string, as FHIR-style
/// `{"entity": {"reference": "Patient/..."}}` or as `{"reference": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "MemberRepr", into = "String")]
pub struct GroupMember(PatientId);

impl GroupMember {
    pub fn new(patient_id: PatientId) -> Self {
        Self(patient_id)
    }

    pub fn patient_id(&self) -> &PatientId {
        &self.0
    }
}

impl From<GroupMember> for String {
    fn from(member: GroupMember) -> Self {
        member.0.reference()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MemberRepr {
    Reference(String),
    Entity { entity: EntityRef },
    Bare(EntityRef),
}

#[derive(Deserialize)]
struct EntityRef {
    reference: String,
}

impl From<MemberRepr> for GroupMember {
    fn from(repr: MemberRepr) -> Self {
        match repr {
            MemberRepr::Reference(reference) => Self(PatientId::from_reference(&reference)),
            MemberRepr::Entity { entity } | MemberRepr::Bare(entity) => {
                Self(PatientId::from_reference(&entity.reference))
            }
        }
    }
}

/// Insight produced by the external analyzer for a qualifying group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub patient_id: PatientId,
    pub insight_code: String,
    pub insight_text: String,
}
