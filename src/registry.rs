use crate::arch::Architecture;
use crate::loader::Loader;
use crate::os::OperatingSystem;

/// An explicit, explicitly-constructed value holding the architecture,
/// loader, and operating-system backends a host has registered.
///
/// Replaces the source's process-wide `ModuleManager` singleton: callers
/// build a `Registry`, hand it to the pieces that need to look up a
/// backend by name, and drop it when done. Nothing here is process-global.
#[derive(Default)]
pub struct Registry {
    architectures: Vec<(String, Box<dyn Architecture>)>,
    loaders: Vec<(String, Box<dyn Loader>)>,
    operating_systems: Vec<(String, Box<dyn OperatingSystem>)>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_architecture(&mut self, name: impl Into<String>, architecture: Box<dyn Architecture>) {
        self.architectures.push((name.into(), architecture));
    }

    pub fn register_loader(&mut self, name: impl Into<String>, loader: Box<dyn Loader>) {
        self.loaders.push((name.into(), loader));
    }

    pub fn register_operating_system(&mut self, name: impl Into<String>, os: Box<dyn OperatingSystem>) {
        self.operating_systems.push((name.into(), os));
    }

    #[must_use]
    pub fn architecture(&self, name: &str) -> Option<&dyn Architecture> {
        self.architectures
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, a)| a.as_ref())
    }

    #[must_use]
    pub fn loader(&self, name: &str) -> Option<&dyn Loader> {
        self.loaders
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, l)| l.as_ref())
    }

    #[must_use]
    pub fn operating_system(&self, name: &str) -> Option<&dyn OperatingSystem> {
        self.operating_systems
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, o)| o.as_ref())
    }

    pub fn architectures(&self) -> impl Iterator<Item = &dyn Architecture> {
        self.architectures.iter().map(|(_, a)| a.as_ref())
    }
}
