//! Built-in preprocessors

pub mod affine;
pub mod channel_selector;
pub mod fixed_duration;
pub mod func;
pub mod min_max_scaler;

// Re-export preprocessor implementations
pub use affine::*;
pub use channel_selector::*;
pub use fixed_duration::*;
pub use func::*;
pub use min_max_scaler::*;

use crate::registry::PreprocessorRegistry;

/// Register all built-in preprocessors with the registry
pub fn register_builtin_preprocessors(registry: &mut PreprocessorRegistry) {
    registry.register(IdentityFactory);
    registry.register(ScaleFactory);
    registry.register(OffsetFactory);
    registry.register(ClipFactory);
    registry.register(ChannelSelectorFactory);
    registry.register(FixedDurationFactory);
    registry.register(MinMaxScalerFactory);
}
