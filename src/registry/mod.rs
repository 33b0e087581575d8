//! Process-wide catalog of live GUI instances.
//!
//! The registry owns the id index (case-insensitive), builds instances from
//! layouts and runs the inactivity eviction of per-player instances on the
//! tokio runtime it was created with.

mod eviction;

pub use eviction::{EvictionTimer, PerPlayer};

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::runtime::Handle;

use crate::config::GuiConfig;
use crate::context::GuiContext;
use crate::error::{GuiError, RegistryError};
use crate::event::GuiObserver;
use crate::host::{Host, Player};
use crate::ids::{is_valid_id, is_valid_per_player_id, per_player_id, registry_key};
use crate::instance::{FillableInstance, GuiInstance, SinglePageInstance};
use crate::layout::{parse, GuiLayout};

/// Instance built from a layout, typed by variant.
pub enum BuiltInstance<T> {
    SinglePage(Arc<SinglePageInstance>),
    Fillable(Arc<FillableInstance<T>>),
}

impl<T: Send + Sync + 'static> BuiltInstance<T> {
    pub fn as_instance(&self) -> Arc<dyn GuiInstance> {
        match self {
            BuiltInstance::SinglePage(i) => Arc::clone(i) as Arc<dyn GuiInstance>,
            BuiltInstance::Fillable(i) => Arc::clone(i) as Arc<dyn GuiInstance>,
        }
    }

    pub fn single_page(&self) -> Option<&Arc<SinglePageInstance>> {
        match self {
            BuiltInstance::SinglePage(i) => Some(i),
            BuiltInstance::Fillable(_) => None,
        }
    }

    pub fn fillable(&self) -> Option<&Arc<FillableInstance<T>>> {
        match self {
            BuiltInstance::Fillable(i) => Some(i),
            BuiltInstance::SinglePage(_) => None,
        }
    }

    pub fn id(&self) -> String {
        match self {
            BuiltInstance::SinglePage(i) => i.id(),
            BuiltInstance::Fillable(i) => i.id(),
        }
    }
}

struct RegistryInner {
    ctx: Arc<GuiContext>,
    /// registry key (lowercased id) → instance
    instances: RwLock<HashMap<String, Arc<dyn GuiInstance>>>,
    runtime: Handle,
    shut_down: AtomicBool,
}

/// Handle to the registry; clones share the same catalog.
#[derive(Clone)]
pub struct GuiRegistry {
    inner: Arc<RegistryInner>,
}

fn same_instance(a: &Arc<dyn GuiInstance>, b: &Arc<dyn GuiInstance>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

impl GuiRegistry {
    /// Create a registry; eviction timers are spawned on `runtime`.
    pub fn new(host: Arc<dyn Host>, config: GuiConfig, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                ctx: Arc::new(GuiContext::new(host, config)),
                instances: RwLock::new(HashMap::new()),
                runtime,
                shut_down: AtomicBool::new(false),
            }),
        }
    }

    pub fn context(&self) -> &Arc<GuiContext> {
        &self.inner.ctx
    }

    pub fn config(&self) -> &GuiConfig {
        self.inner.ctx.config()
    }

    /// Observe events of every instance built by this registry.
    pub fn subscribe(&self, observer: Arc<dyn GuiObserver>) {
        self.inner.ctx.events().subscribe(observer);
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<dyn GuiInstance>>> {
        self.inner.instances.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<dyn GuiInstance>>> {
        self.inner.instances.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_running(&self) -> Result<(), RegistryError> {
        if self.inner.shut_down.load(Ordering::Acquire) {
            return Err(RegistryError::ShutDown);
        }
        Ok(())
    }

    // ============================================
    // Catalog
    // ============================================

    pub fn register(&self, instance: Arc<dyn GuiInstance>) -> Result<(), RegistryError> {
        self.ensure_running()?;
        let id = instance.id();
        if !is_valid_id(&id) {
            return Err(RegistryError::InvalidId(id));
        }
        let key = registry_key(&id);
        let mut instances = self.write();
        if instances.contains_key(&key) {
            return Err(RegistryError::DuplicateId(id));
        }
        instances.insert(key, instance);
        tracing::info!("[registry] [register] id={} total={}", id, instances.len());
        Ok(())
    }

    /// Remove and unload the instance registered as `id`.
    pub fn unregister(&self, id: &str) -> Option<Arc<dyn GuiInstance>> {
        let instance = self.write().remove(&registry_key(id))?;
        if let Some(per_player) = instance.core().per_player() {
            per_player.timer().cancel();
        }
        instance.unload();
        tracing::info!("[registry] [unregister] id={}", instance.id());
        Some(instance)
    }

    /// Case-insensitive lookup.
    pub fn lookup(&self, id: &str) -> Option<Arc<dyn GuiInstance>> {
        self.read().get(&registry_key(id)).cloned()
    }

    pub fn lookup_single_page(&self, id: &str) -> Option<Arc<SinglePageInstance>> {
        self.lookup(id)?.as_any().downcast::<SinglePageInstance>().ok()
    }

    /// Lookup a fillable instance whose fillers carry `T`.
    pub fn lookup_fillable<T: Send + Sync + 'static>(&self, id: &str) -> Option<Arc<FillableInstance<T>>> {
        self.lookup(id)?.as_any().downcast::<FillableInstance<T>>().ok()
    }

    /// Registered instance ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.read().values().map(|i| i.id()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Rename an instance. The uniqueness check and the swap happen under
    /// the index write lock.
    pub fn set_id(&self, old: &str, new: &str) -> Result<(), RegistryError> {
        if !is_valid_id(new) {
            return Err(RegistryError::InvalidId(new.to_string()));
        }
        let old_key = registry_key(old);
        let new_key = registry_key(new);
        let mut instances = self.write();
        let instance = instances
            .get(&old_key)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(old.to_string()))?;
        if new_key != old_key && instances.contains_key(&new_key) {
            return Err(RegistryError::DuplicateId(new.to_string()));
        }
        instances.remove(&old_key);
        instance.core().set_id(new);
        instances.insert(new_key, instance);
        tracing::info!("[registry] [rename] {} -> {}", old, new);
        Ok(())
    }

    // ============================================
    // Factory
    // ============================================

    fn build_with_id<T: Send + Sync + 'static>(&self, layout: &GuiLayout, id: &str) -> BuiltInstance<T> {
        let ctx = Arc::clone(&self.inner.ctx);
        match layout {
            GuiLayout::SinglePage(l) => {
                BuiltInstance::SinglePage(Arc::new(SinglePageInstance::new(id, Arc::clone(l), ctx)))
            }
            GuiLayout::Fillable(l) => {
                BuiltInstance::Fillable(Arc::new(FillableInstance::new(id, Arc::clone(l), ctx)))
            }
        }
    }

    /// Construct the instance matching the layout variant, with the layout's
    /// id. The instance is neither registered nor loaded.
    pub fn build_from_layout<T: Send + Sync + 'static>(&self, layout: &GuiLayout) -> BuiltInstance<T> {
        self.build_with_id(layout, layout.id())
    }

    /// Build, register and load an instance for one player, evicted after
    /// the configured inactivity timeout or when the player disconnects.
    pub fn build_per_player<T: Send + Sync + 'static>(
        &self,
        layout: &GuiLayout,
        player: &Player,
    ) -> Result<BuiltInstance<T>, RegistryError> {
        self.ensure_running()?;
        let id = per_player_id(layout.id(), &player.name);
        if !is_valid_per_player_id(layout.id()) || !is_valid_id(&id) {
            return Err(RegistryError::InvalidPerPlayerId(id));
        }

        let built = self.build_with_id::<T>(layout, &id);
        let instance = built.as_instance();
        self.register(Arc::clone(&instance))?;

        let registry = Arc::downgrade(&self.inner);
        let target = Arc::downgrade(&instance);
        let timer = EvictionTimer::start(
            &self.inner.runtime,
            self.config().per_player_timeout(),
            move || {
                let (Some(inner), Some(instance)) = (registry.upgrade(), target.upgrade()) else {
                    return;
                };
                GuiRegistry { inner }.evict(&instance, "timeout");
            },
        );
        instance
            .core()
            .attach_per_player(PerPlayer::new(player.clone(), timer));
        instance.load();
        tracing::info!("[registry] [per_player] id={} owner={}", id, player.name);
        Ok(built)
    }

    /// Parse a layout file, then build, register and load its instance.
    pub fn register_layout_file<T: Send + Sync + 'static>(
        &self,
        path: &Path,
    ) -> Result<BuiltInstance<T>, GuiError> {
        let layout = parse::load_layout(path, &self.config().main_language)?;
        let built = self.build_from_layout::<T>(&layout);
        let instance = built.as_instance();
        self.register(Arc::clone(&instance))?;
        instance.load();
        Ok(built)
    }

    /// Build, register and load every layout named in `config.preload`.
    pub fn preload<T: Send + Sync + 'static>(&self, layouts: &[GuiLayout]) -> Result<usize, GuiError> {
        let mut count = 0;
        for id in &self.config().preload {
            let layout = layouts
                .iter()
                .find(|l| registry_key(l.id()) == registry_key(id))
                .ok_or_else(|| RegistryError::NotFound(id.clone()))?;
            let instance = self.build_from_layout::<T>(layout).as_instance();
            self.register(Arc::clone(&instance))?;
            instance.load();
            count += 1;
        }
        tracing::info!("[registry] [preload] {} instance(s)", count);
        Ok(count)
    }

    // ============================================
    // Lifecycle
    // ============================================

    /// Remove `instance` if it is still the one registered under its id,
    /// then unload it. Returns true if this call performed the unload.
    fn evict(&self, instance: &Arc<dyn GuiInstance>, reason: &str) -> bool {
        let id = instance.id();
        let key = registry_key(&id);
        {
            let mut instances = self.write();
            if instances.get(&key).is_some_and(|i| same_instance(i, instance)) {
                instances.remove(&key);
            }
        }
        let unloaded = instance.unload();
        tracing::info!("[registry] [evict] id={} reason={} unloaded={}", id, reason, unloaded);
        unloaded
    }

    /// Drop `player` from every instance and evict the instances they own.
    pub fn handle_disconnect(&self, player: &Player) {
        let instances: Vec<Arc<dyn GuiInstance>> = self.read().values().cloned().collect();
        for instance in instances {
            match instance.core().per_player() {
                Some(per_player) if per_player.owner().id == player.id => {
                    // a timer that already fired is evicting on its own
                    if per_player.timer().cancel() {
                        self.evict(&instance, "disconnect");
                    }
                }
                _ => instance.handle_close(player),
            }
        }
        self.inner.ctx.forget_player(player.id);
        tracing::debug!("[registry] [disconnect] player={}", player.name);
    }

    /// Stop every timer and unload every instance. Further registrations fail.
    pub fn shutdown(&self) {
        if self.inner.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        let instances: Vec<Arc<dyn GuiInstance>> = self.write().drain().map(|(_, i)| i).collect();
        for instance in &instances {
            if let Some(per_player) = instance.core().per_player() {
                per_player.timer().cancel();
            }
            instance.unload();
        }
        tracing::info!("[registry] [shutdown] unloaded {} instance(s)", instances.len());
    }
}
