//! Integration tests for the tick schedulers
//!
//! Covers priority ordering, kind and configured priorities, staged
//! add/remove during dispatch and the unbound tickable advisory.

use std::sync::{Arc, Mutex};

use tickwire_core::{
    Advisory, Capability, CompositionContext, CompositionRoot, Container, CoreError, FixedTickable, Injectable,
    Installer, LateTickable, Resolver, RuntimeConfig, Tickable, TickManager, TypeKey,
};

#[derive(Default)]
struct Journal {
    entries: Mutex<Vec<&'static str>>,
}

impl Journal {
    fn record(&self, entry: &'static str) {
        self.entries.lock().unwrap().push(entry);
    }

    fn take(&self) -> Vec<&'static str> {
        std::mem::take(&mut *self.entries.lock().unwrap())
    }
}

macro_rules! recording_tickable {
    ($name:ident, $label:literal) => {
        struct $name {
            journal: Arc<Journal>,
        }

        impl Injectable for $name {
            fn create(resolver: &mut Resolver<'_>) -> Result<Self, CoreError> {
                Ok(Self {
                    journal: resolver.resolve::<Journal>()?,
                })
            }
        }

        impl Tickable for $name {
            fn tick(&self) {
                self.journal.record($label);
            }
        }
    };
}

recording_tickable!(Audio, "audio");
recording_tickable!(Input, "input");
recording_tickable!(Camera, "camera");
recording_tickable!(Network, "network");

trait Physics {}

struct RigidBodies {
    journal: Arc<Journal>,
}

impl Injectable for RigidBodies {
    fn create(resolver: &mut Resolver<'_>) -> Result<Self, CoreError> {
        Ok(Self {
            journal: resolver.resolve::<Journal>()?,
        })
    }
}

impl Tickable for RigidBodies {
    fn tick(&self) {
        self.journal.record("rigid_bodies");
    }
}

impl FixedTickable for RigidBodies {
    fn fixed_tick(&self) {
        self.journal.record("rigid_bodies:fixed");
    }
}

impl LateTickable for RigidBodies {
    fn late_tick(&self) {
        self.journal.record("rigid_bodies:late");
    }
}

struct Orphan;

struct Ragdoll {
    journal: Arc<Journal>,
}

impl Tickable for Ragdoll {
    fn tick(&self) {
        self.journal.record("ragdoll");
    }
}

fn base_container(journal: &Arc<Journal>, config: RuntimeConfig) -> Container {
    let mut container = Container::new();
    container.bind::<Journal>().to_instance(journal.clone()).unwrap();
    container.bind::<RuntimeConfig>().to_instance(Arc::new(config)).unwrap();
    container.bind::<TickManager>().to_single().unwrap();
    container
}

struct SchedulingInstaller {
    journal: Arc<Journal>,
}

impl Installer for SchedulingInstaller {
    fn pre_install_bindings(&mut self, container: &mut Container) -> Result<(), CoreError> {
        container.bind::<Journal>().to_instance(self.journal.clone())?;
        container.bind_tickable::<Audio>()?;
        container.bind_tickable::<Input>()?;
        container.bind_tickable::<Camera>()?;
        container.bind_tickable::<Network>()?;
        container.bind_priority::<Audio>(Capability::Tick, 5)?;
        container.bind_priority::<Input>(Capability::Tick, -3)?;
        container.bind_priority::<Camera>(Capability::Tick, 0)?;
        container.bind_priority::<Network>(Capability::Tick, -3)?;
        Ok(())
    }
}

#[test]
fn test_tasks_dispatch_by_priority_then_registration_order() {
    let journal = Arc::new(Journal::default());
    let mut root = CompositionRoot::new("game").with_installer(SchedulingInstaller {
        journal: journal.clone(),
    });

    let scope = root
        .start(None, Vec::new(), &mut CompositionContext::new(), &[])
        .unwrap();
    scope.update().unwrap();
    assert_eq!(journal.take(), vec!["input", "network", "camera", "audio"]);

    scope.update().unwrap();
    assert_eq!(journal.take(), vec!["input", "network", "camera", "audio"]);
}

#[test]
fn test_phases_dispatch_independently() {
    let journal = Arc::new(Journal::default());
    let mut container = base_container(&journal, RuntimeConfig::default());
    container.bind_tickable::<RigidBodies>().unwrap();
    container.bind_fixed_tickable::<RigidBodies>().unwrap();
    container.bind_late_tickable::<RigidBodies>().unwrap();

    let manager = container.resolve::<TickManager>().unwrap();
    manager.fixed_update().unwrap();
    manager.update().unwrap();
    manager.late_update().unwrap();

    assert_eq!(
        journal.take(),
        vec!["rigid_bodies:fixed", "rigid_bodies", "rigid_bodies:late"]
    );
    assert_eq!(manager.task_count(Capability::FixedTick), 1);
    assert_eq!(manager.task_count(Capability::Initialize), 0);
}

#[test]
fn test_kind_priority_applies_to_derived_types() {
    let journal = Arc::new(Journal::default());
    let mut container = base_container(&journal, RuntimeConfig::default());
    container.declare_kind::<dyn Physics>().tickable();
    container.bind_tickable::<Camera>().unwrap();
    container.bind_tickable::<RigidBodies>().unwrap();
    container.declare::<RigidBodies>().derives_from::<dyn Physics>();
    container.bind_priority::<dyn Physics>(Capability::Tick, -10).unwrap();

    let manager = container.resolve::<TickManager>().unwrap();
    manager.update().unwrap();

    assert_eq!(
        manager.task_order(Capability::Tick),
        vec![TypeKey::of::<RigidBodies>(), TypeKey::of::<Camera>()]
    );
}

#[test]
fn test_exact_priority_wins_over_kind_priority() {
    let journal = Arc::new(Journal::default());
    let mut container = base_container(&journal, RuntimeConfig::default());
    container.declare_kind::<dyn Physics>().tickable();
    container.bind_tickable::<RigidBodies>().unwrap();
    container.bind_tickable::<Camera>().unwrap();
    container.declare::<RigidBodies>().derives_from::<dyn Physics>();
    container.bind_priority::<dyn Physics>(Capability::Tick, -10).unwrap();
    container.bind_priority::<RigidBodies>(Capability::Tick, 20).unwrap();

    let manager = container.resolve::<TickManager>().unwrap();
    manager.update().unwrap();

    assert_eq!(journal.take(), vec!["camera", "rigid_bodies"]);
}

#[test]
fn test_conflicting_kind_priorities_fail() {
    trait Simulation {}

    let journal = Arc::new(Journal::default());
    let mut container = base_container(&journal, RuntimeConfig::default());
    container.declare_kind::<dyn Physics>().tickable();
    container.declare_kind::<dyn Simulation>().tickable();
    container.bind_tickable::<RigidBodies>().unwrap();
    container
        .declare::<RigidBodies>()
        .derives_from::<dyn Physics>()
        .derives_from::<dyn Simulation>();
    container.bind_priority::<dyn Physics>(Capability::Tick, 1).unwrap();
    container.bind_priority::<dyn Simulation>(Capability::Tick, 2).unwrap();

    let error = container.resolve::<TickManager>().err().unwrap();
    assert!(error.is_configuration());
}

#[test]
fn test_priority_for_undeclared_type_fails() {
    let journal = Arc::new(Journal::default());
    let mut container = base_container(&journal, RuntimeConfig::default());
    container.bind_tickable::<Camera>().unwrap();
    container.bind_priority::<Orphan>(Capability::Tick, 3).unwrap();

    let error = container.resolve::<TickManager>().err().unwrap();
    assert!(error.is_configuration());
    assert!(error.to_string().contains("Orphan"));
}

#[test]
fn test_configured_priorities_override_bound_ones() {
    let journal = Arc::new(Journal::default());
    let config = RuntimeConfig::default()
        .with_priority(Capability::Tick, "Audio", -1)
        .with_priority(Capability::Tick, "Camera", 4);
    let mut container = base_container(&journal, config);
    container.bind_tickable::<Camera>().unwrap();
    container.bind_tickable::<Audio>().unwrap();
    container.bind_priority::<Audio>(Capability::Tick, 10).unwrap();

    let manager = container.resolve::<TickManager>().unwrap();
    manager.update().unwrap();

    assert_eq!(journal.take(), vec!["audio", "camera"]);
}

#[test]
fn test_configured_priority_for_unknown_name_fails() {
    let journal = Arc::new(Journal::default());
    let config = RuntimeConfig::default().with_priority(Capability::Tick, "Weather", 1);
    let mut container = base_container(&journal, config);
    container.bind_tickable::<Camera>().unwrap();

    let error = container.resolve::<TickManager>().err().unwrap();
    assert!(error.is_configuration());
}

#[test]
fn test_unbound_tickable_raises_advisory() {
    let journal = Arc::new(Journal::default());
    let config = RuntimeConfig::default().with_warn_for_missing_tickables(true);
    let mut container = base_container(&journal, config);
    container.bind_tickable::<Camera>().unwrap();
    container.declare::<Orphan>().tickable();

    container.resolve::<TickManager>().unwrap();

    assert_eq!(
        container.advisories(),
        vec![Advisory::UnboundTickable {
            type_name: "Orphan".to_string()
        }]
    );
}

#[test]
fn test_missing_tickables_are_silent_unless_enabled() {
    let journal = Arc::new(Journal::default());
    let mut container = base_container(&journal, RuntimeConfig::default());
    container.declare::<Orphan>().tickable();

    container.resolve::<TickManager>().unwrap();
    assert!(container.advisories().is_empty());
}

struct Spawner {
    journal: Arc<Journal>,
    pending: Mutex<Option<(Arc<TickManager>, Arc<Camera>, Arc<Audio>)>>,
}

impl Tickable for Spawner {
    fn tick(&self) {
        self.journal.record("spawner");
        if let Some((manager, spawned, victim)) = self.pending.lock().unwrap().take() {
            manager.add(spawned, -1).unwrap();
            assert!(manager.remove(&victim).unwrap());
        }
    }
}

#[test]
fn test_changes_during_dispatch_apply_next_frame() {
    let journal = Arc::new(Journal::default());
    let manager = Arc::new(TickManager::new());
    let camera = Arc::new(Camera {
        journal: journal.clone(),
    });
    let audio = Arc::new(Audio {
        journal: journal.clone(),
    });
    let spawner = Arc::new(Spawner {
        journal: journal.clone(),
        pending: Mutex::new(Some((manager.clone(), camera, audio.clone()))),
    });

    manager.add(spawner, 0).unwrap();
    manager.add(audio, 1).unwrap();

    manager.update().unwrap();
    assert_eq!(journal.take(), vec!["spawner", "audio"]);

    manager.update().unwrap();
    assert_eq!(journal.take(), vec!["camera", "spawner"]);
    assert_eq!(manager.task_count(Capability::Tick), 2);
}

#[test]
fn test_duplicate_task_is_rejected() {
    let journal = Arc::new(Journal::default());
    let manager = TickManager::new();
    let camera = Arc::new(Camera { journal });

    manager.add(camera.clone(), 0).unwrap();
    let error = manager.add(camera, 1).err().unwrap();
    assert!(error.is_configuration());
}

#[test]
fn test_instance_bound_tickable_keeps_its_concrete_type() {
    let journal = Arc::new(Journal::default());
    let config = RuntimeConfig::default().with_warn_for_missing_tickables(true);
    let mut container = base_container(&journal, config);
    container.bind_tickable::<Camera>().unwrap();
    container
        .bind_tickable_instance(Arc::new(Ragdoll {
            journal: journal.clone(),
        }))
        .unwrap();
    container.bind_priority::<Ragdoll>(Capability::Tick, -5).unwrap();

    let manager = container.resolve::<TickManager>().unwrap();
    manager.update().unwrap();

    assert_eq!(
        manager.task_order(Capability::Tick),
        vec![TypeKey::of::<Ragdoll>(), TypeKey::of::<Camera>()]
    );
    assert_eq!(journal.take(), vec!["ragdoll", "camera"]);
    assert!(container.advisories().is_empty());
}

#[test]
fn test_method_bound_tickable_takes_configured_priority() {
    let journal = Arc::new(Journal::default());
    let config = RuntimeConfig::default().with_priority(Capability::Tick, "Ragdoll", -1);
    let mut container = base_container(&journal, config);
    container.bind_tickable::<Camera>().unwrap();
    container
        .bind::<dyn Tickable>()
        .to_method_of::<Ragdoll, _>(
            |resolver| {
                Ok(Arc::new(Ragdoll {
                    journal: resolver.resolve::<Journal>()?,
                }))
            },
            |ragdoll| ragdoll,
        )
        .unwrap();
    container.declare::<Ragdoll>().tickable();

    let manager = container.resolve::<TickManager>().unwrap();
    manager.update().unwrap();

    assert_eq!(journal.take(), vec!["ragdoll", "camera"]);
}
