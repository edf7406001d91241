use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use stagehooks_core::*;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Settings {
    music: f32,
    subtitles: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Health {
    life: i32,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let clock = ManualClock::new();
    let game = Game::builder()
        .config(GameConfig {
            debug: true,
            ..GameConfig::default()
        })
        .clock(clock.clone())
        .build();

    let menu = game.add_scene("Menu");
    let level = game.add_scene("Level1");

    let settings = with_persistent_state(
        &menu,
        "settings",
        Settings {
            music: 0.8,
            subtitles: false,
        },
        PersistOptions::new().storage_key("demo.settings"),
    )?;
    settings.patch(json!({ "subtitles": true }))?;

    let score = with_local_state(&level, "score", 0u32, StateOptions::new())?;
    score.on(StateEvent::Change, |new: &u32, old: &u32| {
        log::info!("score {old} -> {new}");
    });
    for _ in 0..3 {
        score.update(|s| s + 10)?;
    }

    let hp = with_undoable_state(&level, "hp", Health { life: 100 }, Some(10), StateOptions::new())?;
    let alive = with_computed_state(&level, "alive", &hp, |h: &Health| h.life > 0)?;
    hp.set(Health { life: 40 })?;
    hp.set(Health { life: 0 })?;
    log::info!("alive after the hit: {:?}", alive.get());
    hp.undo();
    log::info!("alive after undo: {:?}, hp {:?}", alive.get(), hp.get());

    let search = with_debounced_state(&menu, "search", String::new(), None, StateOptions::new())?;
    search.on(StateEvent::Change, |new: &String, _old: &String| {
        log::info!("searching for '{new}'");
    });
    for query in ["s", "sw", "swo", "sword"] {
        search.set(query.to_string())?;
        clock.advance(Duration::from_millis(100));
        game.update();
    }
    clock.advance(game.config().debounce_delay());
    game.update();

    println!("search:   {:?}", search.get());

    // the global settings survive the menu going away
    menu.destroy();
    let from_level = with_state_def::<Settings>(&level, "global:settings", None, StateOptions::new().global())?;
    from_level.patch(json!({ "music": 0.3 }))?;
    let saved = game.storage(StorageKind::Durable).get_item("demo.settings")?;
    println!("score:    {:?}", score.get());
    println!("hp:       {:?}", hp.get());
    println!("settings: {:?}", from_level.get());
    println!("saved:    {}", saved.unwrap_or_default());
    Ok(())
}
