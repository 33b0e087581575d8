use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use invgui::host::{HostCall, RecordingHost};
use invgui::icon::{IconKind, PageDirection, Sound};
use invgui::lang::StaticLanguages;
use invgui::layout::OpenActions;
use invgui::{
    ClickType, FillableLayoutBuilder, GuiConfig, GuiEvent, GuiEventKind, GuiFiller, GuiInstance,
    GuiLayout, GuiRegistry, IconLayoutSpec, IconSpec, Language, LayoutBuilder, Player,
    PlaceholderFiller,
};

fn en() -> Language {
    Language::new("en")
}

fn de() -> Language {
    Language::new("de")
}

struct Warp {
    name: String,
}

struct WarpFiller(Warp);

impl GuiFiller<Warp> for WarpFiller {
    fn data(&self) -> &Warp {
        &self.0
    }

    fn format_placeholders(&self, text: &str, _language: &Language) -> String {
        text.replace("{warp}", &self.0.name)
    }
}

fn warp(i: usize) -> WarpFiller {
    WarpFiller(Warp {
        name: format!("warp{}", i),
    })
}

fn setup(config: GuiConfig) -> (Arc<RecordingHost>, GuiRegistry) {
    let languages = StaticLanguages::new(en())
        .with_lang_file(en(), "gui.click-cooldown: Slow down!")
        .with_lang_file(de(), "gui.click-cooldown: Langsam!");
    let host = Arc::new(RecordingHost::with_languages(languages));
    let registry = GuiRegistry::new(host.clone(), config, tokio::runtime::Handle::current());
    (host, registry)
}

/// rows = 3, fill window [9, 17], switchers at 18 and 26.
fn warps_layout() -> GuiLayout {
    let mut b = FillableLayoutBuilder::new("warps", 3, en()).unwrap();
    b.set_title(en(), "Warps {current_page}/{max_page}");
    b.set_title(de(), "Warps (de) {current_page}/{max_page}");
    b.set_fill_window(9, 17).unwrap();
    b.set_icon_layout(IconLayoutSpec::from_icon(
        IconSpec::new("entry", "ender_pearl")
            .with_name(en(), "{warp}")
            .with_command("warp {warp} {player}"),
    ))
    .unwrap();
    b.set_empty_list_icon(IconSpec::new("none", "barrier").with_name(en(), "No warps"))
        .unwrap();
    b.set_icon(
        IconSpec::new("prev", "arrow").at(18).with_kind(IconKind::PageSwitcher {
            direction: PageDirection::Previous,
            inactive: None,
        }),
    )
    .unwrap();
    b.set_icon(
        IconSpec::new("next", "arrow").at(26).with_kind(IconKind::PageSwitcher {
            direction: PageDirection::Next,
            inactive: None,
        }),
    )
    .unwrap();
    b.build().unwrap().into()
}

/// One row: a free icon at 0, a permission icon at 1, a keep-open icon at 2.
fn menu_layout() -> GuiLayout {
    let mut b = LayoutBuilder::new("menu", 1, en()).unwrap();
    b.set_title(en(), "Menu");
    b.set_click_sound(Some(Sound::new("ui.click")));
    b.set_open_actions(OpenActions {
        messages: [(en(), vec!["Welcome {player}".to_string()])].into_iter().collect(),
        sound: Some(Sound::new("chest.open")),
    });
    b.set_icon(IconSpec::new("spawn", "bed").at(0).with_command("spawn {player}"))
        .unwrap();
    b.set_icon(
        IconSpec::new("admin", "command_block")
            .at(1)
            .with_permission("gui.admin")
            .with_command("op {player}"),
    )
    .unwrap();
    b.set_icon(IconSpec::new("stay", "clock").at(2).keep_open(true).with_command("time"))
        .unwrap();
    b.build().unwrap().into()
}

fn open_menu(registry: &GuiRegistry, player: &Player) -> Arc<dyn GuiInstance> {
    let gui = registry.build_from_layout::<()>(&menu_layout()).as_instance();
    registry.register(Arc::clone(&gui)).unwrap();
    assert!(gui.open(player, false));
    gui
}

fn count_events(registry: &GuiRegistry, pred: fn(&GuiEventKind) -> bool) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&count);
    registry.subscribe(Arc::new(move |e: &mut GuiEvent| {
        if pred(e.kind()) {
            c.fetch_add(1, Ordering::SeqCst);
        }
    }));
    count
}

// ============================================
// Pagination
// ============================================

#[tokio::test]
async fn test_ten_fillers_make_two_pages() {
    let (_, registry) = setup(GuiConfig::default());
    let built = registry.build_from_layout::<Warp>(&warps_layout());
    let warps = built.fillable().unwrap();
    for i in 0..10 {
        warps.add_filler(warp(i));
    }
    warps.load();

    assert_eq!(warps.page_count(), 2);
    let first = warps.rendered_page(&en(), 0).unwrap();
    for (i, slot) in (9..18).enumerate() {
        let icon = first.icon_at(slot).unwrap();
        assert_eq!(icon.display_name.as_deref(), Some(format!("warp{}", i).as_str()));
    }
    let second = warps.rendered_page(&en(), 1).unwrap();
    assert_eq!(second.icon_at(9).unwrap().display_name.as_deref(), Some("warp9"));
    assert!((10..18).all(|slot| second.icon_at(slot).is_none()));
    assert_eq!(warps.filler_at(1, 9).unwrap().data().name, "warp9");
}

#[tokio::test]
async fn test_generated_pages_preserve_filler_order() {
    let (_, registry) = setup(GuiConfig::default());
    let built = registry.build_from_layout::<Warp>(&warps_layout());
    let warps = built.fillable().unwrap();
    for i in 0..25 {
        warps.add_filler(warp(i));
    }
    warps.load();

    assert_eq!(warps.page_count(), 3);
    let names: Vec<String> = (0..warps.page_count())
        .flat_map(|p| warps.generated_page(p).unwrap())
        .map(|icon| icon.display_name[&en()].clone())
        .collect();
    assert_eq!(names.len(), 25);
    assert!(names.iter().all(|n| n == "{warp}"));
    let data: Vec<String> = (0..3)
        .flat_map(|p| (9..18).map(move |s| (p, s)))
        .filter_map(|(p, s)| warps.filler_at(p, s))
        .map(|f| f.data().name.clone())
        .collect();
    let expected: Vec<String> = (0..25).map(|i| format!("warp{}", i)).collect();
    assert_eq!(data, expected);
}

#[tokio::test]
async fn test_empty_list_page_shared_by_languages() {
    let (_, registry) = setup(GuiConfig::default());
    let built = registry.build_from_layout::<Warp>(&warps_layout());
    let warps = built.fillable().unwrap();
    warps.load();

    assert_eq!(warps.page_count(), 1);
    for lang in [en(), de()] {
        let page = warps.rendered_page(&lang, 0).unwrap();
        assert!((9..18).all(|s| page.icon_at(s).unwrap().id == "none"));
        assert_eq!(page.icon_at(9).unwrap().display_name.as_deref(), Some("No warps"));
    }
    assert_eq!(warps.title(&de(), 0).as_deref(), Some("Warps (de) 1/1"));
}

#[tokio::test]
async fn test_refresh_is_idempotent() {
    let (host, registry) = setup(GuiConfig::default());
    let built = registry.build_from_layout::<Warp>(&warps_layout());
    let warps = built.fillable().unwrap();
    for i in 0..12 {
        warps.add_filler(warp(i));
    }
    let alice = Player::new(1, "alice");
    warps.open(&alice, false);

    let before: Vec<_> = (0..2).map(|p| warps.rendered_page(&en(), p)).collect();
    host.take_calls();
    warps.refresh();
    let after: Vec<_> = (0..2).map(|p| warps.rendered_page(&en(), p)).collect();

    assert_eq!(before, after);
    // nothing changed, nothing pushed to the viewer
    assert!(host.calls().is_empty());
}

#[tokio::test]
async fn test_refresh_pushes_changes_to_viewers() {
    let (host, registry) = setup(GuiConfig::default());
    let built = registry.build_from_layout::<Warp>(&warps_layout());
    let warps = built.fillable().unwrap();
    warps.add_filler(warp(0));
    let alice = Player::new(1, "alice");
    warps.open(&alice, false);
    host.take_calls();

    warps.add_filler(warp(1));
    warps.refresh();
    let calls = host.calls();
    assert_eq!(calls.len(), 1);
    let HostCall::Update { player, page } = &calls[0] else {
        panic!("expected an in-place update, got {:?}", calls[0]);
    };
    assert_eq!(*player, alice.id);
    assert_eq!(page.icon_at(10).unwrap().display_name.as_deref(), Some("warp1"));
}

#[tokio::test]
async fn test_languages_render_separately() {
    let (host, registry) = setup(GuiConfig::default());
    host.languages().set_player_language(invgui::PlayerId(2), de());
    let built = registry.build_from_layout::<Warp>(&warps_layout());
    let warps = built.fillable().unwrap();
    warps.add_filler(warp(0));

    let bob = Player::new(2, "bob");
    assert!(warps.open(&bob, false));
    let opened = host.calls().into_iter().find_map(|c| match c {
        HostCall::Open { title, .. } => Some(title),
        _ => None,
    });
    assert_eq!(opened.as_deref(), Some("Warps (de) 1/1"));
    // no German name: falls back to the main language
    let page = warps.rendered_page(&de(), 0).unwrap();
    assert_eq!(page.icon_at(9).unwrap().display_name.as_deref(), Some("warp0"));
}

// ============================================
// Click and drag
// ============================================

#[tokio::test]
async fn test_icon_click_runs_commands_and_closes() {
    let (host, registry) = setup(GuiConfig::default());
    let alice = Player::new(1, "alice");
    let gui = open_menu(&registry, &alice);

    assert!(gui.handle_click(&alice, 0, ClickType::Left));
    assert_eq!(host.commands(), vec!["spawn alice".to_string()]);
    let calls = host.calls();
    assert!(calls.contains(&HostCall::Sound {
        player: alice.id,
        sound: "ui.click".to_string()
    }));
    assert!(calls.contains(&HostCall::Close { player: alice.id }));
    assert!(!gui.is_viewing(alice.id));
}

#[tokio::test]
async fn test_keep_open_icon() {
    let (host, registry) = setup(GuiConfig::default());
    let alice = Player::new(1, "alice");
    let gui = open_menu(&registry, &alice);

    gui.handle_click(&alice, 2, ClickType::Right);
    assert_eq!(host.commands(), vec!["time".to_string()]);
    assert!(gui.is_viewing(alice.id));
}

#[tokio::test]
async fn test_permission_gate_behaves_like_empty_slot() {
    let (host, registry) = setup(GuiConfig::default());
    let empty_clicks = count_events(&registry, |k| matches!(k, GuiEventKind::EmptySlotClick { .. }));
    let alice = Player::new(1, "alice");
    let gui = open_menu(&registry, &alice);

    assert!(gui.handle_click(&alice, 1, ClickType::Left));
    assert!(gui.handle_click(&alice, 5, ClickType::Left));
    assert!(gui.handle_click(&alice, 40, ClickType::Left));
    assert_eq!(empty_clicks.load(Ordering::SeqCst), 3);
    assert!(host.commands().is_empty());

    host.grant(alice.id, "gui.admin");
    gui.handle_click(&alice, 1, ClickType::Left);
    assert_eq!(host.commands(), vec!["op alice".to_string()]);
}

#[tokio::test]
async fn test_interact_veto_aborts_click() {
    let (host, registry) = setup(GuiConfig::default());
    let icon_clicks = count_events(&registry, |k| matches!(k, GuiEventKind::IconClick { .. }));
    registry.subscribe(Arc::new(|e: &mut GuiEvent| {
        if matches!(e.kind(), GuiEventKind::Interact { .. }) {
            e.set_cancelled(true);
        }
    }));
    let alice = Player::new(1, "alice");
    let gui = open_menu(&registry, &alice);

    assert!(gui.handle_click(&alice, 0, ClickType::Left));
    assert_eq!(icon_clicks.load(Ordering::SeqCst), 0);
    assert!(host.commands().is_empty());
    assert!(gui.is_viewing(alice.id));
}

#[tokio::test]
async fn test_observer_vetoes_actions_and_uncancels() {
    let (host, registry) = setup(GuiConfig::default());
    registry.subscribe(Arc::new(|e: &mut GuiEvent| {
        if matches!(e.kind(), GuiEventKind::IconClick { .. }) {
            e.set_perform_actions(false);
            e.set_cancelled(false);
        }
    }));
    let alice = Player::new(1, "alice");
    let gui = open_menu(&registry, &alice);

    assert!(!gui.handle_click(&alice, 0, ClickType::Left));
    assert!(host.commands().is_empty());
    assert!(gui.is_viewing(alice.id));
}

#[tokio::test]
async fn test_drag_cancelled_unless_allowed() {
    let (_, registry) = setup(GuiConfig::default());
    let alice = Player::new(1, "alice");
    let gui = open_menu(&registry, &alice);
    assert!(gui.handle_drag(&alice, &[0, 1]));

    registry.subscribe(Arc::new(|e: &mut GuiEvent| {
        if let GuiEventKind::Drag { slots } = e.kind() {
            if slots.iter().all(|&s| s >= 3) {
                e.set_cancelled(false);
            }
        }
    }));
    assert!(gui.handle_drag(&alice, &[0, 4]));
    assert!(!gui.handle_drag(&alice, &[4, 5]));
}

#[tokio::test]
async fn test_click_cooldown() {
    let config = GuiConfig {
        click_cooldown_ms: 60_000,
        ..GuiConfig::default()
    };
    let (host, registry) = setup(config);
    let alice = Player::new(1, "alice");
    let gui = open_menu(&registry, &alice);

    gui.handle_click(&alice, 2, ClickType::Left);
    assert!(gui.handle_click(&alice, 2, ClickType::Left));
    assert_eq!(host.commands(), vec!["time".to_string()]);
    assert!(host.calls().contains(&HostCall::Message {
        player: alice.id,
        message: "Slow down!".to_string()
    }));
}

#[tokio::test]
async fn test_page_switcher_click_turns_page() {
    let (_, registry) = setup(GuiConfig::default());
    let built = registry.build_from_layout::<Warp>(&warps_layout());
    let warps = built.fillable().unwrap();
    for i in 0..10 {
        warps.add_filler(warp(i));
    }
    let alice = Player::new(1, "alice");
    warps.open(&alice, false);

    // previous switcher is hidden on the first page
    assert!(warps.handle_click(&alice, 18, ClickType::Left));
    assert_eq!(warps.viewer_page(alice.id), Some(0));

    warps.handle_click(&alice, 26, ClickType::Left);
    assert_eq!(warps.viewer_page(alice.id), Some(1));
    assert_eq!(warps.title(&en(), 1).as_deref(), Some("Warps 2/2"));

    warps.handle_click(&alice, 18, ClickType::Left);
    assert_eq!(warps.viewer_page(alice.id), Some(0));
}

// ============================================
// Opening
// ============================================

#[tokio::test]
async fn test_open_cancellation_leaves_viewer_unregistered() {
    let (host, registry) = setup(GuiConfig::default());
    registry.subscribe(Arc::new(|e: &mut GuiEvent| {
        let banned = e.player().is_some_and(|p| p.name == "mallory");
        if banned && matches!(e.kind(), GuiEventKind::Open { .. }) {
            e.set_cancelled(true);
        }
    }));
    let gui = registry.build_from_layout::<()>(&menu_layout()).as_instance();

    let mallory = Player::new(66, "mallory");
    assert!(!gui.open(&mallory, true));
    assert!(!gui.is_viewing(mallory.id));
    assert!(host.calls().is_empty());

    let alice = Player::new(1, "alice");
    assert!(gui.open(&alice, true));
    assert!(gui.is_viewing(alice.id));
}

#[tokio::test]
async fn test_open_actions() {
    let (host, registry) = setup(GuiConfig::default());
    let gui = registry.build_from_layout::<()>(&menu_layout()).as_instance();
    let alice = Player::new(1, "alice");

    gui.open(&alice, true);
    let calls = host.take_calls();
    assert!(calls.contains(&HostCall::Message {
        player: alice.id,
        message: "Welcome alice".to_string()
    }));
    assert!(calls.contains(&HostCall::Sound {
        player: alice.id,
        sound: "chest.open".to_string()
    }));

    gui.open(&alice, false);
    assert!(host
        .take_calls()
        .iter()
        .all(|c| !matches!(c, HostCall::Message { .. } | HostCall::Sound { .. })));

    let config = GuiConfig {
        open_actions_enabled: false,
        ..GuiConfig::default()
    };
    let (host, registry) = setup(config);
    let gui = registry.build_from_layout::<()>(&menu_layout()).as_instance();
    gui.open(&alice, true);
    assert!(host
        .calls()
        .iter()
        .all(|c| !matches!(c, HostCall::Message { .. } | HostCall::Sound { .. })));
}

// ============================================
// Layout files
// ============================================

#[tokio::test]
async fn test_register_layout_file() {
    let dir = std::env::temp_dir().join("invgui_test_register_layout_file");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("lobby.yml");
    std::fs::write(
        &path,
        "settings:\n  rows: 1\ntitles:\n  en: Lobby\nicons:\n  play:\n    position: 4\n    material: sword\n    on_click: [\"join {player}\"]\n",
    )
    .unwrap();

    let (host, registry) = setup(GuiConfig::default());
    let built = registry.register_layout_file::<()>(&path).unwrap();
    assert_eq!(built.id(), "lobby");
    let gui = registry.lookup("LOBBY").unwrap();
    assert!(gui.is_loaded());

    let alice = Player::new(1, "alice");
    gui.open(&alice, false);
    gui.handle_click(&alice, 4, ClickType::Left);
    assert_eq!(host.commands(), vec!["join alice".to_string()]);

    assert!(registry.register_layout_file::<()>(&path).is_err());
    std::fs::remove_dir_all(dir).ok();
}

#[tokio::test]
async fn test_placeholder_filler_with_translator() {
    let (_, registry) = setup(GuiConfig::default());
    let built = registry.build_from_layout::<u32>(&warps_layout());
    let warps = built.fillable().unwrap();
    warps.add_filler(PlaceholderFiller::new(7).with("warp", "spawn"));
    warps.core().set_title_translator(Some(Arc::new(|raw: &str, lang: &Language, page: usize| {
        format!("{} [{}#{}]", raw, lang, page)
    })));
    warps.load();

    let page = warps.rendered_page(&en(), 0).unwrap();
    assert_eq!(page.title, "Warps 1/1 [en#0]");
    assert_eq!(page.icon_at(9).unwrap().commands, vec!["warp spawn {player}".to_string()]);
}
