pub mod reaction;

pub use reaction::handle_reaction_add;
