//! Output configuration for declaration dumps
//!
//! [`DumpConfig`] controls ordering, filtering and annotation of the generated
//! declarations. Everything else about an image (which records exist, their encodings)
//! comes from the image itself.

use crate::typesystem::Expansion;

/// Configuration of a declaration dump
///
/// # Examples
///
/// ```rust
/// use classdump::DumpConfig;
///
/// let config = DumpConfig::default()
///     .with_sort_methods(true)
///     .with_ivar_offsets(true)
///     .with_name_filter("Controller");
/// assert!(config.sort_methods);
/// assert_eq!(config.name_filter.as_deref(), Some("Controller"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct DumpConfig {
    /// Order declarations alphabetically. Only applies when inheritance sorting is off,
    /// otherwise ties of the inheritance order are already alphabetical.
    pub sort_classes: bool,

    /// Order declarations so superclasses and adopted protocols come first
    pub sort_classes_by_inheritance: bool,

    /// Order methods and properties alphabetically within a declaration
    pub sort_methods: bool,

    /// Annotate instance variables with their byte offset
    pub show_ivar_offsets: bool,

    /// Annotate methods with their implementation address
    pub show_method_addresses: bool,

    /// Write structure member lists inline instead of referencing the structure by name
    pub expand_structures: bool,

    /// With `expand_structures`, write each structure inline only at its first use in an
    /// ivar block and refer to it by name afterwards
    pub expand_first_use_only: bool,

    /// Drop methods that are accessors of a declared property
    pub strip_synthesized: bool,

    /// Drop `.cxx_construct` and `.cxx_destruct`
    pub strip_ctor_dtor: bool,

    /// Drop methods a superclass inside the image already declares
    pub strip_overrides: bool,

    /// Write one output unit per class, category and protocol instead of one stream
    pub per_unit_output: bool,

    /// Start the output with a banner and the placeholder typedefs
    pub show_header: bool,

    /// Only dump declarations whose name contains this string
    pub name_filter: Option<String>,

    /// Only list methods whose selector contains this string
    pub search_method: Option<String>,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            sort_classes: false,
            sort_classes_by_inheritance: true,
            sort_methods: false,
            show_ivar_offsets: false,
            show_method_addresses: false,
            expand_structures: false,
            expand_first_use_only: false,
            strip_synthesized: false,
            strip_ctor_dtor: false,
            strip_overrides: false,
            per_unit_output: false,
            show_header: true,
            name_filter: None,
            search_method: None,
        }
    }
}

impl DumpConfig {
    /// Creates a configuration that keeps the input order and writes no annotations
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            sort_classes_by_inheritance: false,
            show_header: false,
            ..Self::default()
        }
    }

    /// Creates a configuration that writes every annotation and sorts everything
    #[must_use]
    pub fn verbose() -> Self {
        Self {
            sort_methods: true,
            show_ivar_offsets: true,
            show_method_addresses: true,
            ..Self::default()
        }
    }

    /// Structure expansion policy for the type formatter
    #[must_use]
    pub fn expansion(&self) -> Expansion {
        match (self.expand_structures, self.expand_first_use_only) {
            (false, _) => Expansion::Never,
            (true, false) => Expansion::Always,
            (true, true) => Expansion::FirstUse,
        }
    }

    /// Returns true if a declaration name passes the name filter
    #[must_use]
    pub fn matches_name(&self, name: &str) -> bool {
        self.name_filter
            .as_deref()
            .map_or(true, |filter| name.contains(filter))
    }

    /// Enable or disable alphabetical declaration order
    #[must_use]
    pub fn with_sort_classes(mut self, enabled: bool) -> Self {
        self.sort_classes = enabled;
        self
    }

    /// Enable or disable inheritance order
    #[must_use]
    pub fn with_sort_by_inheritance(mut self, enabled: bool) -> Self {
        self.sort_classes_by_inheritance = enabled;
        self
    }

    /// Enable or disable alphabetical method order
    #[must_use]
    pub fn with_sort_methods(mut self, enabled: bool) -> Self {
        self.sort_methods = enabled;
        self
    }

    /// Enable or disable ivar offset comments
    #[must_use]
    pub fn with_ivar_offsets(mut self, enabled: bool) -> Self {
        self.show_ivar_offsets = enabled;
        self
    }

    /// Enable or disable method address comments
    #[must_use]
    pub fn with_method_addresses(mut self, enabled: bool) -> Self {
        self.show_method_addresses = enabled;
        self
    }

    /// Enable or disable inline structure expansion
    #[must_use]
    pub fn with_expand_structures(mut self, enabled: bool) -> Self {
        self.expand_structures = enabled;
        self
    }

    /// Limit inline structure expansion to the first use in each ivar block
    #[must_use]
    pub fn with_expand_first_use_only(mut self, enabled: bool) -> Self {
        self.expand_first_use_only = enabled;
        self
    }

    /// Enable or disable stripping of synthesized property accessors
    #[must_use]
    pub fn with_strip_synthesized(mut self, enabled: bool) -> Self {
        self.strip_synthesized = enabled;
        self
    }

    /// Enable or disable stripping of C++ constructors and destructors
    #[must_use]
    pub fn with_strip_ctor_dtor(mut self, enabled: bool) -> Self {
        self.strip_ctor_dtor = enabled;
        self
    }

    /// Enable or disable stripping of overridden methods
    #[must_use]
    pub fn with_strip_overrides(mut self, enabled: bool) -> Self {
        self.strip_overrides = enabled;
        self
    }

    /// Select per-unit or combined output
    #[must_use]
    pub fn with_per_unit_output(mut self, enabled: bool) -> Self {
        self.per_unit_output = enabled;
        self
    }

    /// Enable or disable the banner
    #[must_use]
    pub fn with_header(mut self, enabled: bool) -> Self {
        self.show_header = enabled;
        self
    }

    /// Only dump declarations whose name contains `filter`
    #[must_use]
    pub fn with_name_filter(mut self, filter: impl Into<String>) -> Self {
        self.name_filter = Some(filter.into());
        self
    }

    /// Only list methods whose selector contains `selector`
    #[must_use]
    pub fn with_search_method(mut self, selector: impl Into<String>) -> Self {
        self.search_method = Some(selector.into());
        self
    }
}
