use formdom::NodeId;

/// Information about a single control's failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// `name` attribute of the control (empty when absent).
    pub field_name: String,
    /// Display name.
    pub label: String,
    /// Primary element (for focusing).
    pub node: NodeId,
    /// Failure reason; `None` when the control was invalidated without one.
    pub message: Option<String>,
}

/// Last-known validity of a form's controls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ValidationResult {
    /// All controls passed validation.
    #[default]
    Valid,
    /// One or more controls failed validation.
    Invalid(Vec<FieldError>),
}

impl ValidationResult {
    /// Check if all controls passed validation.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn is_invalid(&self) -> bool {
        !self.is_valid()
    }

    /// Get all validation errors.
    pub fn errors(&self) -> &[FieldError] {
        match self {
            Self::Valid => &[],
            Self::Invalid(errors) => errors,
        }
    }

    pub fn first_error(&self) -> Option<&FieldError> {
        self.errors().first()
    }

    /// Element of the first invalid control (for focusing).
    pub fn first_invalid_node(&self) -> Option<NodeId> {
        self.first_error().map(|e| e.node)
    }

    /// All messages, in control order.
    pub fn messages(&self) -> Vec<&str> {
        self.errors()
            .iter()
            .filter_map(|e| e.message.as_deref())
            .collect()
    }
}

impl FromIterator<FieldError> for ValidationResult {
    fn from_iter<I: IntoIterator<Item = FieldError>>(iter: I) -> Self {
        let errors: Vec<_> = iter.into_iter().collect();
        if errors.is_empty() {
            Self::Valid
        } else {
            Self::Invalid(errors)
        }
    }
}
