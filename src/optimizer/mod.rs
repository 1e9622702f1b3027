pub mod crossover;
pub mod fitness;
pub mod mutation;
pub mod population;
pub mod runner;
pub mod selection;

pub use self::crossover::Crossover;
pub use self::mutation::Mutation;
pub use self::population::Population;
pub use self::runner::{
    GenerationStats, NoProgress, ProgressCallback, StopReason, Trainer, TrainingOptions,
    TrainingResult,
};
pub use self::selection::RouletteSelector;
