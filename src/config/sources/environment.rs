//! Environment source: TREESWAP_<SECTION>__<KEY> variables.

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment};

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("TREESWAP")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    )
}
