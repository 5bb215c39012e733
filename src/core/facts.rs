//! Per-file analysis facts, one variant per source dialect.
//!
//! A `FileAnalysis` is created fresh by an analyzer's `parse` call and is
//! immutable afterwards; downstream detectors derive new values instead of
//! mutating it. An analysis that carries parse errors always carries the
//! dialect's empty fact set, never a partial one.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::Language;

/// Inclusive 1-indexed line span of a declaration or fragment
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn line_count(&self) -> usize {
        self.end.saturating_sub(self.start) + 1
    }

    pub fn contains(&self, line: usize) -> bool {
        line >= self.start && line <= self.end
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileAnalysis {
    pub path: PathBuf,
    pub language: Language,
    pub facts: AnalysisFacts,
    pub errors: Vec<String>,
}

impl FileAnalysis {
    pub fn new(path: PathBuf, language: Language, facts: AnalysisFacts) -> Self {
        Self {
            path,
            language,
            facts,
            errors: Vec::new(),
        }
    }

    /// An analysis flagged with a parse error; fact lists are empty so a
    /// malformed file never contributes inconsistent facts to a batch.
    pub fn with_error(path: PathBuf, language: Language, message: impl Into<String>) -> Self {
        Self {
            path,
            language,
            facts: AnalysisFacts::empty_for(language),
            errors: vec![message.into()],
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn php(&self) -> Option<&PhpFacts> {
        match &self.facts {
            AnalysisFacts::Php(facts) => Some(facts),
            _ => None,
        }
    }

    pub fn css(&self) -> Option<&CssFacts> {
        match &self.facts {
            AnalysisFacts::Css(facts) => Some(facts),
            _ => None,
        }
    }

    pub fn javascript(&self) -> Option<&JsFacts> {
        match &self.facts {
            AnalysisFacts::JavaScript(facts) => Some(facts),
            _ => None,
        }
    }

    pub fn blade(&self) -> Option<&BladeFacts> {
        match &self.facts {
            AnalysisFacts::Blade(facts) => Some(facts),
            _ => None,
        }
    }

    pub fn laravel(&self) -> Option<&LaravelFacts> {
        match &self.facts {
            AnalysisFacts::Laravel(facts) => Some(facts),
            _ => None,
        }
    }
}

/// Dialect-specific fact sets behind one sum type so cross-dialect
/// orchestration stays dialect-agnostic.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum AnalysisFacts {
    Php(PhpFacts),
    Css(CssFacts),
    JavaScript(JsFacts),
    Blade(BladeFacts),
    /// Framework-convention facts (routes, migrations, model relationships)
    /// extracted from PHP files in conventional locations.
    Laravel(LaravelFacts),
}

impl AnalysisFacts {
    pub fn empty_for(language: Language) -> Self {
        match language {
            Language::Php => AnalysisFacts::Php(PhpFacts::default()),
            Language::Css => AnalysisFacts::Css(CssFacts::default()),
            Language::JavaScript => AnalysisFacts::JavaScript(JsFacts::default()),
            Language::Blade => AnalysisFacts::Blade(BladeFacts::default()),
        }
    }
}

// ---------------------------------------------------------------------------
// PHP
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PhpFacts {
    pub namespace: Option<String>,
    pub imports: Vec<UseImport>,
    pub classes: Vec<ClassDecl>,
    pub functions: Vec<FunctionDecl>,
    pub calls: Vec<CallRef>,
    pub name_refs: Vec<NameRef>,
    pub variables: Vec<VariableRef>,
}

/// A `use` statement binding a name into the file's scope
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UseImport {
    pub path: String,
    pub alias: Option<String>,
    pub line: usize,
}

impl UseImport {
    /// The short name the import binds: the alias if present, otherwise the
    /// last path segment.
    pub fn bound_name(&self) -> &str {
        self.alias
            .as_deref()
            .unwrap_or_else(|| self.path.rsplit('\\').next().unwrap_or(&self.path))
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Class,
    Interface,
    Trait,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: String,
    pub fqcn: String,
    pub kind: ClassKind,
    pub is_abstract: bool,
    pub extends: Option<String>,
    pub implements: Vec<String>,
    pub span: Span,
    pub methods: Vec<MethodDecl>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

impl Visibility {
    pub fn is_public(&self) -> bool {
        matches!(self, Visibility::Public)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_abstract: bool,
    pub params: Vec<String>,
    pub return_type: Option<String>,
    pub span: Span,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<String>,
    pub span: Span,
}

/// Who a call is dispatched through
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CallReceiver {
    /// `$this->method()`
    This,
    /// `$other->method()` where the receiver's type is unknown statically
    Instance,
    /// `self::method()`
    SelfType,
    /// `parent::method()`
    Parent,
    /// `static::method()`
    LateStatic,
    /// `SomeClass::method()`
    Class(String),
    /// Free function call `helper()`
    Function,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CallRef {
    pub receiver: CallReceiver,
    pub method: String,
    pub line: usize,
}

/// Syntactic position in which a class-like name was referenced
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum NameRefKind {
    StaticAccess,
    New,
    TypeHint,
    Instanceof,
    Catch,
    Attribute,
    Plain,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct NameRef {
    pub name: String,
    pub line: usize,
    pub kind: NameRefKind,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum VariableKind {
    Assign,
    Read,
    Param,
    LoopBinding,
    CatchBinding,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct VariableRef {
    /// Enclosing method or function name, None at file scope
    pub scope: Option<String>,
    pub name: String,
    pub line: usize,
    pub kind: VariableKind,
}

// ---------------------------------------------------------------------------
// CSS
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CssFacts {
    pub rules: Vec<CssRule>,
    pub media_queries: Vec<MediaQuery>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CssRule {
    pub selectors: Vec<String>,
    /// Declaration block with whitespace collapsed and declarations sorted,
    /// used as the duplicate-grouping key.
    pub normalized_declarations: String,
    pub span: Span,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MediaQuery {
    pub condition: String,
    pub span: Span,
}

impl CssFacts {
    pub fn selectors(&self) -> impl Iterator<Item = &str> {
        self.rules
            .iter()
            .flat_map(|rule| rule.selectors.iter().map(String::as_str))
    }
}

// ---------------------------------------------------------------------------
// JavaScript
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct JsFacts {
    pub functions: Vec<JsFunction>,
    pub variables: Vec<JsVariable>,
    pub calls: Vec<JsCall>,
    /// Identifier occurrences on top-level lines, for read tracking
    pub idents: Vec<JsIdentRef>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JsFunction {
    pub name: String,
    pub params: Vec<String>,
    /// Body with whitespace collapsed and identifiers preserved, used for
    /// cross-file duplicate grouping.
    pub normalized_body: String,
    pub span: Span,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JsVariable {
    pub name: String,
    pub line: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JsCall {
    pub name: String,
    pub line: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JsIdentRef {
    pub name: String,
    pub line: usize,
}

// ---------------------------------------------------------------------------
// Blade templates
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BladeFacts {
    pub extends: Option<String>,
    pub includes: Vec<BladeRef>,
    pub sections: Vec<BladeSection>,
    pub yields: Vec<BladeRef>,
    pub components: Vec<BladeRef>,
    pub fragments: Vec<TemplateFragment>,
    pub variables: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BladeRef {
    pub name: String,
    pub line: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BladeSection {
    pub name: String,
    pub span: Span,
}

/// A contiguous markup block considered as one unit for duplicate detection
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TemplateFragment {
    pub raw: String,
    /// Structure with literal text and variable names replaced by
    /// placeholders, whitespace collapsed.
    pub normalized: String,
    pub span: Span,
    /// Recurring CSS class tokens, used to derive component names.
    pub class_tokens: Vec<String>,
}

// ---------------------------------------------------------------------------
// Framework conventions
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LaravelFacts {
    pub routes: Vec<RouteDecl>,
    /// Route names referenced via `route('...')` anywhere in the file
    pub route_refs: Vec<String>,
    pub migrations: Vec<MigrationOp>,
    pub relationships: Vec<ModelRelationship>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RouteDecl {
    pub verb: String,
    pub uri: String,
    pub handler: String,
    pub name: Option<String>,
    pub line: usize,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum MigrationKind {
    Create,
    Modify,
    Drop,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MigrationOp {
    pub table: String,
    pub kind: MigrationKind,
    pub line: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelRelationship {
    pub model: String,
    pub kind: String,
    pub target: String,
    pub line: usize,
}
