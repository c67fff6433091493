pub mod translation_store;

pub use translation_store::JsonTranslationStore;
