use serde::Serialize;

/// Row id of a symbol in the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SymbolId(pub i64);

/// How a non-top-level symbol is owned by its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberRole {
    Child,
    ProducedType,
    Predefined,
    Field,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Child => "child",
            MemberRole::ProducedType => "produced_type",
            MemberRole::Predefined => "predefined",
            MemberRole::Field => "field",
        }
    }

    pub fn parse(raw: &str) -> Option<MemberRole> {
        match raw {
            "child" => Some(MemberRole::Child),
            "produced_type" => Some(MemberRole::ProducedType),
            "predefined" => Some(MemberRole::Predefined),
            "field" => Some(MemberRole::Field),
            _ => None,
        }
    }
}

/// An addressable node in the metadata graph, materialized from the snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Symbol {
    pub id: SymbolId,
    pub fqn: String,
    pub kind: String,
    pub name: String,
    /// Top-level collection key ("Catalogs", "CommonModules", ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    pub top_level: bool,
    #[serde(skip)]
    pub container_id: Option<SymbolId>,
    /// Name of the collection feature in the container that owns this
    /// symbol ("Attributes", "Forms", ...). Used for path display.
    #[serde(skip)]
    pub container_feature: Option<String>,
    #[serde(skip)]
    pub member_role: Option<MemberRole>,
    #[serde(skip)]
    pub internal: bool,
}

/// One incoming graph edge: some symbol references the target through a
/// named feature.
#[derive(Debug, Clone)]
pub struct BackReference {
    pub source: Symbol,
    pub feature: String,
    pub transient: bool,
}

/// Opaque location inside a text module. Byte offsets resolve exactly;
/// fragment tokens are the legacy approximate scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentAddress {
    Offset(usize),
    Fragment(String),
}

/// A located match of a symbol's identity inside a text module.
#[derive(Debug, Clone)]
pub struct CorpusOccurrence {
    pub module_path: String,
    pub address: FragmentAddress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleRole {
    Module,
    ObjectModule,
    ManagerModule,
    RecordSetModule,
    ValueManagerModule,
    CommandModule,
    FormModule,
}

impl ModuleRole {
    fn from_file_name(name: &str) -> Option<ModuleRole> {
        match name {
            "Module.bsl" => Some(ModuleRole::Module),
            "ObjectModule.bsl" => Some(ModuleRole::ObjectModule),
            "ManagerModule.bsl" => Some(ModuleRole::ManagerModule),
            "RecordSetModule.bsl" => Some(ModuleRole::RecordSetModule),
            "ValueManagerModule.bsl" => Some(ModuleRole::ValueManagerModule),
            "CommandModule.bsl" => Some(ModuleRole::CommandModule),
            _ => None,
        }
    }
}

/// Decomposition of a corpus module path into its owning metadata object.
#[derive(Debug, Clone)]
pub struct ModulePathInfo {
    pub owner_fqn: Option<String>,
    pub role: Option<ModuleRole>,
    pub form_name: Option<String>,
}

impl ModulePathInfo {
    /// Parse paths like `Catalogs/Items/Forms/ItemForm/Module.bsl` or
    /// `CommonModules/Utils/Module.bsl`. Unknown layouts yield all-None.
    pub fn parse(module_path: &str) -> ModulePathInfo {
        let segments: Vec<&str> = module_path.split('/').filter(|s| !s.is_empty()).collect();
        let none = ModulePathInfo {
            owner_fqn: None,
            role: None,
            form_name: None,
        };
        if segments.len() < 3 {
            return none;
        }
        let file = segments[segments.len() - 1];
        let Some(type_name) = type_for_collection(segments[0]) else {
            return none;
        };

        // Form module: Collection/Name/Forms/FormName/Module.bsl
        if segments.len() >= 5 && segments[2] == "Forms" && file == "Module.bsl" {
            return ModulePathInfo {
                owner_fqn: Some(format!("{}.{}", type_name, segments[1])),
                role: Some(ModuleRole::FormModule),
                form_name: Some(segments[3].to_string()),
            };
        }

        let mut role = ModuleRole::from_file_name(file);
        // Command module: Collection/Name/Commands/CommandName/CommandModule.bsl
        if segments.len() >= 5 && segments[2] == "Commands" && file == "CommandModule.bsl" {
            role = Some(ModuleRole::CommandModule);
        }
        ModulePathInfo {
            owner_fqn: Some(format!("{}.{}", type_name, segments[1])),
            role,
            form_name: None,
        }
    }
}

/// One incoming-reference record before deduplication.
#[derive(Debug, Clone)]
pub struct Reference {
    pub category: String,
    pub source_path: String,
    pub feature: Option<String>,
    /// 1-based source line, 0 = unknown. Meaningful only for textual hits.
    pub line: u32,
    pub is_textual: bool,
}

/// A single textual call to a target method.
#[derive(Debug, Clone)]
pub struct CallSite {
    pub module_path: String,
    pub line: u32,
}

/// A procedure or function declaration found in a module.
#[derive(Debug, Clone, Serialize)]
pub struct MethodDecl {
    pub name: String,
    pub line: u32,
}

// Report types returned over RPC.

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceItem {
    pub source_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    pub is_textual: bool,
}

#[derive(Debug, Serialize)]
pub struct CategoryBucket {
    pub label: String,
    pub items: Vec<ReferenceItem>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceReport {
    pub target: String,
    pub total_count: usize,
    pub categories: Vec<CategoryBucket>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallGroup {
    pub module_path: String,
    pub lines: Vec<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallGraphReport {
    pub method_signature: String,
    pub caller_count: usize,
    pub groups: Vec<CallGroup>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestStats {
    pub symbols: usize,
    pub edges: usize,
    pub duration_ms: u64,
}

/// Known top-level metadata types: (singular FQN prefix, collection key).
pub const TYPE_TABLE: &[(&str, &str)] = &[
    ("Catalog", "Catalogs"),
    ("Document", "Documents"),
    ("CommonModule", "CommonModules"),
    ("Enum", "Enums"),
    ("Report", "Reports"),
    ("DataProcessor", "DataProcessors"),
    ("InformationRegister", "InformationRegisters"),
    ("AccumulationRegister", "AccumulationRegisters"),
    ("Constant", "Constants"),
    ("ExchangePlan", "ExchangePlans"),
    ("Subsystem", "Subsystems"),
];

/// Map a type prefix (singular or plural, any case) to its collection key.
pub fn collection_for_type(type_name: &str) -> Option<&'static str> {
    TYPE_TABLE.iter().find_map(|(singular, collection)| {
        if type_name.eq_ignore_ascii_case(singular) || type_name.eq_ignore_ascii_case(collection) {
            Some(*collection)
        } else {
            None
        }
    })
}

/// Map a collection key (any case) back to the singular FQN type prefix.
pub fn type_for_collection(collection: &str) -> Option<&'static str> {
    TYPE_TABLE.iter().find_map(|(singular, key)| {
        if collection.eq_ignore_ascii_case(key) {
            Some(*singular)
        } else {
            None
        }
    })
}

/// Human-readable category label for a collection key:
/// "CommonModules" -> "Common modules", "Catalogs" -> "Catalogs".
pub fn display_category(collection: &str) -> String {
    let mut out = String::with_capacity(collection.len() + 4);
    for (i, ch) in collection.chars().enumerate() {
        if i == 0 {
            out.push(ch);
        } else if ch.is_uppercase() {
            out.push(' ');
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
