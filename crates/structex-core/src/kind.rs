//! Problem types: the metamodel that binds exception-level metadata to a
//! content schema.
//!
//! A [`ProblemType`] is produced by one [`ProblemTypeBuilder::build`] call,
//! which yields both halves of the declaration at once: the RFC 7807
//! metadata (`typename`, `title`, `detail`, `status`) and the composed
//! [`ContentSchema`]. The schema of a type is always composed from the
//! schemas of its bases, so the type lattice and the schema lattice move in
//! lockstep.
//!
//! Most code declares types statically with
//! [`declare_problem!`](crate::declare_problem):
//!
//! ```
//! use structex_core::roots::ERROR;
//!
//! structex_core::declare_problem! {
//!     /// Raised when a filesystem has insufficient space.
//!     pub static INSUFFICIENT_SPACE: InsufficientSpace(ERROR) {
//!         detail = "Filesystem {path} has only {avail} bytes free, need {need}";
//!         path: Str => "The filesystem mount point";
//!         avail: Int => "Number of bytes free on the filesystem";
//!         need: Int => "Number of bytes needed";
//!     }
//! }
//!
//! assert_eq!(INSUFFICIENT_SPACE.title(), "Raised when a filesystem has insufficient space.");
//! assert_eq!(INSUFFICIENT_SPACE.schema().len(), 3);
//! assert!(INSUFFICIENT_SPACE.is_subtype_of(&ERROR));
//! ```

use crate::field::FieldSpec;
use crate::registry;
use crate::schema::ContentSchema;
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, LazyLock};

/// Status used when neither the declaration nor any base sets one.
pub const DEFAULT_STATUS: u16 = 400;

/// Attribute names that always belong to the type, never to its content.
pub const RESERVED_NAMES: [&str; 4] = ["typename", "title", "detail", "status"];

/// A statically declared problem type, built on first use.
pub type Declared = LazyLock<Arc<ProblemType>>;

/// A structured problem type.
///
/// Instances of the type are [`Problem`](crate::Problem) values.
pub struct ProblemType {
    name: String,
    module: Option<String>,
    typename: String,
    title: String,
    detail: Option<String>,
    status: u16,
    own_detail: Option<String>,
    own_status: Option<u16>,
    doc: Option<String>,
    bases: Vec<Arc<ProblemType>>,
    ancestors: Vec<Arc<ProblemType>>,
    schema: Arc<ContentSchema>,
    attributes: IndexMap<String, Value>,
}

impl ProblemType {
    /// Starts a new declaration.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ProblemTypeBuilder {
        ProblemTypeBuilder::new(name)
    }

    /// Returns the declared (short) name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declaring module, if one was given.
    #[must_use]
    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    /// Returns `<module>.<name>` with `::` separators rewritten as dots.
    #[must_use]
    pub fn qualname(&self) -> String {
        match &self.module {
            Some(module) => format!("{}.{}", dotted(module), self.name),
            None => self.name.clone(),
        }
    }

    /// Returns the wire discriminator.
    #[must_use]
    pub fn typename(&self) -> &str {
        &self.typename
    }

    /// Returns the short human description.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the detail template, declared or inherited.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Returns the HTTP-like status code.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Returns the full documentation text, if any.
    #[must_use]
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Returns the direct base types, in declaration order.
    #[must_use]
    pub fn bases(&self) -> &[Arc<ProblemType>] {
        &self.bases
    }

    /// Returns every ancestor in resolution order, nearest first.
    ///
    /// The order is the C3 linearization of the bases: each type appears
    /// before its own bases and bases keep their declaration order.
    #[must_use]
    pub fn ancestors(&self) -> &[Arc<ProblemType>] {
        &self.ancestors
    }

    /// Returns the content schema.
    #[must_use]
    pub fn schema(&self) -> &Arc<ContentSchema> {
        &self.schema
    }

    /// Returns a private attribute (a declaration entry starting with `_`).
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Returns `true` if `self` is `other` or inherits from it.
    #[must_use]
    pub fn is_subtype_of(&self, other: &ProblemType) -> bool {
        std::ptr::eq(self, other) || self.bases.iter().any(|base| base.is_subtype_of(other))
    }

    /// Returns every registered type that strictly inherits from `self`.
    #[must_use]
    pub fn subtypes(&self) -> Vec<Arc<ProblemType>> {
        registry::registry().subtypes_of(self)
    }

    /// Returns `true` if no registered type inherits from `self`.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.subtypes().is_empty()
    }
}

impl fmt::Debug for ProblemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProblemType")
            .field("typename", &self.typename)
            .field("title", &self.title)
            .field("status", &self.status)
            .field(
                "bases",
                &self.bases.iter().map(|b| b.name()).collect::<Vec<_>>(),
            )
            .field("fields", &self.schema.fields().keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ProblemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.typename)
    }
}

fn dotted(module: &str) -> String {
    module.replace("::", ".")
}

fn linearize(bases: &[Arc<ProblemType>]) -> Vec<Arc<ProblemType>> {
    let mut seqs: Vec<Vec<Arc<ProblemType>>> = bases
        .iter()
        .map(|base| {
            std::iter::once(Arc::clone(base))
                .chain(base.ancestors.iter().cloned())
                .collect()
        })
        .collect();
    seqs.push(bases.to_vec());

    let mut order: Vec<Arc<ProblemType>> = Vec::new();
    loop {
        seqs.retain(|seq| !seq.is_empty());
        if seqs.is_empty() {
            return order;
        }

        let head = seqs
            .iter()
            .map(|seq| &seq[0])
            .find(|candidate| {
                !seqs
                    .iter()
                    .any(|seq| seq[1..].iter().any(|other| Arc::ptr_eq(other, candidate)))
            })
            .cloned();

        let Some(head) = head else {
            tracing::warn!(
                bases = ?bases.iter().map(|b| b.name()).collect::<Vec<_>>(),
                "inconsistent base order; falling back to depth-first resolution"
            );
            for kind in seqs.into_iter().flatten() {
                if !order.iter().any(|seen| Arc::ptr_eq(seen, &kind)) {
                    order.push(kind);
                }
            }
            return order;
        };

        for seq in &mut seqs {
            if Arc::ptr_eq(&seq[0], &head) {
                seq.remove(0);
            }
        }
        order.push(head);
    }
}

fn first_line(doc: &str) -> Option<&str> {
    doc.lines().map(str::trim).find(|line| !line.is_empty())
}

/// Builder for [`ProblemType`] declarations.
///
/// Entries passed to [`field`](Self::field) are routed: the reserved names
/// `typename`, `title`, `detail` and `status` set type metadata from the
/// entry's default value, names starting with `_` become private
/// attributes, and everything else becomes a content field.
#[derive(Debug)]
pub struct ProblemTypeBuilder {
    name: String,
    module: Option<String>,
    doc: Option<String>,
    typename: Option<String>,
    title: Option<String>,
    detail: Option<String>,
    status: Option<u16>,
    bases: Vec<Arc<ProblemType>>,
    fields: Vec<FieldSpec>,
    attributes: IndexMap<String, Value>,
}

impl ProblemTypeBuilder {
    /// Creates a builder for a type called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            module: None,
            doc: None,
            typename: None,
            title: None,
            detail: None,
            status: None,
            bases: Vec::new(),
            fields: Vec::new(),
            attributes: IndexMap::new(),
        }
    }

    /// Sets the declaring module (usually `module_path!()`).
    #[must_use]
    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Sets the documentation text. Each line is trimmed; blank text is
    /// ignored.
    #[must_use]
    pub fn doc(mut self, doc: impl AsRef<str>) -> Self {
        let text = doc
            .as_ref()
            .lines()
            .map(str::trim)
            .collect::<Vec<_>>()
            .join("\n");
        let text = text.trim();
        self.doc = (!text.is_empty()).then(|| text.to_string());
        self
    }

    /// Overrides the wire discriminator.
    #[must_use]
    pub fn typename(mut self, typename: impl Into<String>) -> Self {
        self.typename = Some(typename.into());
        self
    }

    /// Overrides the title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the detail template.
    #[must_use]
    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Sets the status code.
    #[must_use]
    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Adds a base type.
    #[must_use]
    pub fn base(mut self, base: &Arc<ProblemType>) -> Self {
        self.bases.push(Arc::clone(base));
        self
    }

    /// Adds several base types, in order.
    #[must_use]
    pub fn bases<'a>(mut self, bases: impl IntoIterator<Item = &'a Arc<ProblemType>>) -> Self {
        self.bases.extend(bases.into_iter().cloned());
        self
    }

    /// Adds a private attribute.
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Adds a declaration entry, routing it as described on the builder.
    #[must_use]
    pub fn field(mut self, spec: FieldSpec) -> Self {
        let name = spec.name().to_string();
        let default = spec.default_value().cloned();

        if RESERVED_NAMES.contains(&name.as_str()) {
            self.route_reserved(&name, default);
        } else if name.starts_with('_') {
            self.attributes.insert(name, default.unwrap_or(Value::Null));
        } else {
            self.fields.push(spec);
        }
        self
    }

    fn route_reserved(&mut self, name: &str, default: Option<Value>) {
        match (name, default) {
            ("typename", Some(Value::String(s))) => self.typename = Some(s),
            ("title", Some(Value::String(s))) => self.title = Some(s),
            ("detail", Some(Value::String(s))) => self.detail = Some(s),
            ("status", Some(Value::Number(n))) => {
                if let Some(status) = n.as_u64().and_then(|s| u16::try_from(s).ok()) {
                    self.status = Some(status);
                }
            }
            (name, _) => {
                tracing::debug!(
                    problem = %self.name,
                    attribute = name,
                    "reserved attribute declared without a usable value; ignored"
                );
            }
        }
    }

    /// Finishes the declaration and registers the type.
    pub fn build(self) -> Arc<ProblemType> {
        let typename = self.typename.unwrap_or_else(|| match &self.module {
            Some(module) => format!("{}.{}", dotted(module), self.name),
            None => self.name.clone(),
        });
        let title = self
            .title
            .or_else(|| self.doc.as_deref().and_then(first_line).map(str::to_string))
            .unwrap_or_default();
        // Metadata resolves along the ancestor order, so an explicit value
        // on a later base beats an inherited one on an earlier base.
        let ancestors = linearize(&self.bases);
        let detail = self
            .detail
            .clone()
            .or_else(|| ancestors.iter().find_map(|a| a.own_detail.clone()));
        let status = self
            .status
            .or_else(|| ancestors.iter().find_map(|a| a.own_status))
            .unwrap_or(DEFAULT_STATUS);

        let parent_schemas: Vec<Arc<ContentSchema>> =
            self.bases.iter().map(|b| Arc::clone(&b.schema)).collect();
        let schema = Arc::new(ContentSchema::compose(
            self.name.clone(),
            &parent_schemas,
            self.fields,
        ));

        let kind = Arc::new(ProblemType {
            name: self.name,
            module: self.module,
            typename,
            title,
            detail,
            status,
            own_detail: self.detail,
            own_status: self.status,
            doc: self.doc,
            bases: self.bases,
            ancestors,
            schema,
            attributes: self.attributes,
        });

        tracing::debug!(
            typename = %kind.typename,
            status = kind.status,
            fields = kind.schema.len(),
            "declared problem type"
        );
        registry::raw().register(Arc::clone(&kind));
        kind
    }
}

/// Declares one or more statically known problem types.
///
/// Each declaration becomes a `static` of type
/// [`Declared`](crate::kind::Declared) and is registered automatically, so
/// wire decoding can find it without it having been touched first.
///
/// The body holds metadata assignments and content fields:
///
/// - `typename = "...";`, `title = "...";`, `detail = "...";`, `status = 404;`
///   (`detail` placeholders accept the format specs described in
///   [`template`](crate::template), e.g. `{avail:,}` or `{code:03}`)
/// - `name: Type;` with `Type` one of `Str`, `Int`, `Float`, `Bool`, `Any`,
///   optionally followed by `= default` and/or `=> "title"`.
///
/// Doc comments become the type's documentation; the first line is the
/// default title.
///
/// ```
/// use structex_core::roots::ERROR;
///
/// structex_core::declare_problem! {
///     /// Raised when an operation can't be done right now.
///     pub static PLEASE_WAIT: PleaseWait(ERROR) {
///         status = 503;
///         detail = "Please wait at least {howlong} seconds";
///         howlong: Int = 30 => "Minimum amount of time to wait";
///     }
/// }
///
/// assert_eq!(PLEASE_WAIT.status(), 503);
/// assert!(!PLEASE_WAIT.schema().field("howlong").unwrap().is_required());
/// ```
#[macro_export]
macro_rules! declare_problem {
    () => {};

    (
        $(#[doc = $doc:literal])*
        $vis:vis static $ident:ident : $name:ident $(( $($base:expr),* $(,)? ))? { $($body:tt)* }
        $($rest:tt)*
    ) => {
        $(#[doc = $doc])*
        $vis static $ident: $crate::kind::Declared = $crate::kind::Declared::new(|| {
            let builder = $crate::kind::ProblemType::builder(::core::stringify!($name))
                .module(::core::module_path!())
                .doc(::core::concat!($($doc, "\n",)*))
                $( $( .base(&$base) )* )?;
            $crate::declare_problem!(@body builder; $($body)*).build()
        });

        $crate::__private::inventory::submit! {
            $crate::registry::Declaration::new(&$ident)
        }

        $crate::declare_problem!($($rest)*);
    };

    (@body $builder:expr;) => { $builder };

    (@body $builder:expr; typename = $value:expr; $($rest:tt)*) => {
        $crate::declare_problem!(@body $builder.typename($value); $($rest)*)
    };
    (@body $builder:expr; title = $value:expr; $($rest:tt)*) => {
        $crate::declare_problem!(@body $builder.title($value); $($rest)*)
    };
    (@body $builder:expr; detail = $value:expr; $($rest:tt)*) => {
        $crate::declare_problem!(@body $builder.detail($value); $($rest)*)
    };
    (@body $builder:expr; status = $value:expr; $($rest:tt)*) => {
        $crate::declare_problem!(@body $builder.status($value); $($rest)*)
    };

    (@body $builder:expr;
        $field:ident : $ty:ident $(= $default:expr)? $(=> $title:expr)? ; $($rest:tt)*
    ) => {
        $crate::declare_problem!(@body $builder.field(
            $crate::field::FieldSpec::new(
                ::core::stringify!($field),
                $crate::field::FieldType::$ty,
            )
            $( .default($default) )?
            $( .title($title) )?
        ); $($rest)*)
    };
}
