/// Declares a system by name and the components an entity must carry to join it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemDescriptor {
    name: String,
    components: Vec<String>,
}

impl SystemDescriptor {
    /// Create a new descriptor with the provided name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: Vec::new(),
        }
    }

    /// Require one more component.
    pub fn with(mut self, component: impl Into<String>) -> Self {
        self.add_component(component);
        self
    }

    /// Replace the required component set.
    pub fn requires<I, S>(mut self, components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.components.clear();
        for component in components {
            self.add_component(component);
        }
        self
    }

    /// Append a single required component; repeats are ignored.
    pub fn add_component(&mut self, component: impl Into<String>) {
        let component = component.into();
        if !self.components.contains(&component) {
            self.components.push(component);
        }
    }

    /// Unique system name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Required component names, in declaration order.
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// A system with no requirements never receives entities automatically.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}
