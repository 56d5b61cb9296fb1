//! The table of supported stored queries.
//!
//! Every entry pairs a parameter rule table with a root strategy and a
//! gather strategy. All entries share the closure stage.

use std::fmt;

use registry_state::ObjectKind;

use crate::domain::ParamRule;
use crate::gather::{self, GatherFn, CONFIDENTIALITY_CODE_PARAM, FORMAT_CODE_PARAM};
use crate::resolve::RootSpec;

pub const GET_SUBMISSION_SET_AND_CONTENTS: &str = "urn:uuid:e8e3cb2c-e39c-46b9-99e4-c12f57260b83";
pub const GET_FOLDER_AND_CONTENTS: &str = "urn:uuid:b909a503-523d-4517-8acf-8e5834dfc4c7";
pub const GET_DOCUMENTS_AND_ASSOCIATIONS: &str = "urn:uuid:bab9529a-4a10-40b3-a01f-f68a615d247a";

pub const SUBMISSION_SET_ENTRY_UUID: &str = "$XDSSubmissionSetEntryUUID";
pub const SUBMISSION_SET_UNIQUE_ID: &str = "$XDSSubmissionSetUniqueId";
pub const FOLDER_ENTRY_UUID: &str = "$XDSFolderEntryUUID";
pub const FOLDER_UNIQUE_ID: &str = "$XDSFolderUniqueId";
pub const DOCUMENT_ENTRY_UUID: &str = "$XDSDocumentEntryEntryUUID";
pub const DOCUMENT_UNIQUE_ID: &str = "$XDSDocumentEntryUniqueId";

/// A stored query: how to validate, where to anchor, what to gather.
pub struct StoredQueryDef {
    pub id: &'static str,
    pub name: &'static str,
    pub rules: &'static [ParamRule],
    pub root: RootSpec,
    pub gather: GatherFn,
}

impl fmt::Debug for StoredQueryDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredQueryDef")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("rules", &self.rules)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl StoredQueryDef {
    pub fn matches(&self, query_id: &str) -> bool {
        self.id.eq_ignore_ascii_case(query_id) || self.name == query_id
    }
}

const SUBMISSION_SET_RULES: &[ParamRule] = &[
    ParamRule::required(SUBMISSION_SET_ENTRY_UUID).alternative(SUBMISSION_SET_UNIQUE_ID),
    ParamRule::required(SUBMISSION_SET_UNIQUE_ID).alternative(SUBMISSION_SET_ENTRY_UUID),
    ParamRule::optional(FORMAT_CODE_PARAM).repeatable(),
    ParamRule::optional(CONFIDENTIALITY_CODE_PARAM).repeatable(),
];

const FOLDER_RULES: &[ParamRule] = &[
    ParamRule::required(FOLDER_ENTRY_UUID).alternative(FOLDER_UNIQUE_ID),
    ParamRule::required(FOLDER_UNIQUE_ID).alternative(FOLDER_ENTRY_UUID),
    ParamRule::optional(FORMAT_CODE_PARAM).repeatable(),
    ParamRule::optional(CONFIDENTIALITY_CODE_PARAM).repeatable(),
];

const DOCUMENT_RULES: &[ParamRule] = &[
    ParamRule::required(DOCUMENT_ENTRY_UUID).alternative(DOCUMENT_UNIQUE_ID),
    ParamRule::required(DOCUMENT_UNIQUE_ID).alternative(DOCUMENT_ENTRY_UUID),
];

pub static STORED_QUERIES: &[StoredQueryDef] = &[
    StoredQueryDef {
        id: GET_SUBMISSION_SET_AND_CONTENTS,
        name: "GetSubmissionSetAndContents",
        rules: SUBMISSION_SET_RULES,
        root: RootSpec {
            kind: ObjectKind::SubmissionSet,
            entry_uuid_param: SUBMISSION_SET_ENTRY_UUID,
            unique_id_param: SUBMISSION_SET_UNIQUE_ID,
        },
        gather: gather::submission_set_contents,
    },
    StoredQueryDef {
        id: GET_FOLDER_AND_CONTENTS,
        name: "GetFolderAndContents",
        rules: FOLDER_RULES,
        root: RootSpec {
            kind: ObjectKind::Folder,
            entry_uuid_param: FOLDER_ENTRY_UUID,
            unique_id_param: FOLDER_UNIQUE_ID,
        },
        gather: gather::folder_contents,
    },
    StoredQueryDef {
        id: GET_DOCUMENTS_AND_ASSOCIATIONS,
        name: "GetDocumentsAndAssociations",
        rules: DOCUMENT_RULES,
        root: RootSpec {
            kind: ObjectKind::DocumentEntry,
            entry_uuid_param: DOCUMENT_ENTRY_UUID,
            unique_id_param: DOCUMENT_UNIQUE_ID,
        },
        gather: gather::document_neighbours,
    },
];

/// Find a stored query by URN or short name.
pub fn lookup(query_id: &str) -> Option<&'static StoredQueryDef> {
    STORED_QUERIES.iter().find(|def| def.matches(query_id.trim()))
}

/// The URN for a supported query; unknown ids come back unchanged.
pub fn canonical_id(query_id: &str) -> &str {
    lookup(query_id).map_or(query_id, |def| def.id)
}
