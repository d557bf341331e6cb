pub mod synthetic_scene;

pub use synthetic_scene::SyntheticSceneRenderer;
