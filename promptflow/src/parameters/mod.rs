//! Parameter values, templating and name mapping.

mod bag;
mod mapper;
mod reserved;
mod template;

pub use bag::ParameterBag;
pub use mapper::map_available_to_expected_parameters;
pub use reserved::{
    is_reserved_parameter_name, reserved_parameters, RESERVED_PARAMETER_MISSING_VALUE,
    RESERVED_PARAMETER_NAMES, RESERVED_PARAMETER_RESTRICTED,
};
pub use template::{extract_parameter_names, template_parameters};

use std::collections::BTreeMap;

/// Parameter values keyed by name.
pub type Parameters = BTreeMap<String, String>;
