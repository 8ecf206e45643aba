//! Read-only access to named state elements for recording devices

use crate::state::StateIndex;

/// State elements a recorder may sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recordable {
    /// Membrane potential (mV)
    VM,
    /// Excitatory conductance (nS)
    GEx,
    /// Inhibitory conductance (nS)
    GIn,
    /// Sodium activation
    ActM,
    /// Sodium inactivation
    InactH,
    /// Potassium activation
    ActN,
}

impl Recordable {
    /// Every recordable, in registry order
    pub const ALL: [Recordable; 6] = [
        Recordable::VM,
        Recordable::GEx,
        Recordable::GIn,
        Recordable::ActM,
        Recordable::InactH,
        Recordable::ActN,
    ];

    /// Stable external name
    pub const fn name(self) -> &'static str {
        match self {
            Self::VM => "V_m",
            Self::GEx => "g_ex",
            Self::GIn => "g_in",
            Self::ActM => "Act_m",
            Self::InactH => "Inact_h",
            Self::ActN => "Act_n",
        }
    }

    /// State element backing the recordable
    pub const fn state_index(self) -> StateIndex {
        match self {
            Self::VM => StateIndex::VM,
            Self::GEx => StateIndex::GExc,
            Self::GIn => StateIndex::GInh,
            Self::ActM => StateIndex::HhM,
            Self::InactH => StateIndex::HhH,
            Self::ActN => StateIndex::HhN,
        }
    }

    /// Resolve an external name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.name() == name)
    }
}

/// Accessor reading one value from a model instance
pub type Accessor<T> = fn(&T) -> f64;

/// Immutable name-to-accessor table, built once per model type
#[derive(Debug)]
pub struct RecordablesMap<T> {
    entries: Vec<(&'static str, Accessor<T>)>,
}

impl<T> RecordablesMap<T> {
    /// Build from `(name, accessor)` pairs
    pub fn new(entries: Vec<(&'static str, Accessor<T>)>) -> Self {
        Self { entries }
    }

    /// Accessor for `name`
    pub fn get(&self, name: &str) -> Option<Accessor<T>> {
        self.entries
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, accessor)| *accessor)
    }

    /// Registered names
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Capability to read named state without access to the model's internals
pub trait Observable: Sized + 'static {
    /// The model's registry
    fn recordables() -> &'static RecordablesMap<Self>;

    /// Read a typed recordable
    fn read(&self, recordable: Recordable) -> f64;

    /// Read by external name
    fn read_named(&self, name: &str) -> Option<f64> {
        Self::recordables().get(name).map(|accessor| accessor(self))
    }
}
