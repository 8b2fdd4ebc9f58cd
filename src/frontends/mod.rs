mod devcontainer;

pub use devcontainer::DevContainerFrontend;
