//! roll-picker — browse a directory as a photo library.
//!
//! Loads the library page by page through the picker core, applies the
//! requested toggles and prints the list together with the resulting
//! selection. Mostly useful for exercising the picker outside a UI.

#![warn(clippy::all)]

mod cli;
mod shutdown;

use std::sync::Arc;

use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use roll_picker::retry::load_next_with_retry;
use roll_picker::{
    DirectoryAccess, LocalLibrary, Picker, PickerEvent, SelectMode, ToggleOutcome,
};

/// Log whatever the picker reported since the last call.
fn report(events: &mut mpsc::UnboundedReceiver<PickerEvent>) {
    while let Ok(event) = events.try_recv() {
        match event {
            PickerEvent::FirstPageReady { count } => {
                tracing::info!(count, "First page ready");
            }
            PickerEvent::SelectionChanged { assets, toggled } => {
                tracing::info!(selected = assets.len(), uri = %toggled.uri, "Selection changed");
            }
            PickerEvent::SelectionLimitReached { maximum, rejected } => {
                tracing::warn!(
                    uri = %rejected.uri,
                    "You have already selected all {} assets allowed",
                    maximum
                );
            }
            PickerEvent::FetchFailed { message, retryable } => {
                tracing::warn!(retryable, "{}", message);
            }
            PickerEvent::PermissionDenied { reason } => {
                tracing::error!("Permission not granted: {}", reason);
            }
        }
    }
}

fn print_text(picker: &Picker) {
    let scope = picker.scope();
    println!(
        "Scope: {} in {}",
        scope.group_types.as_str(),
        scope.group_name.as_deref().unwrap_or("all albums")
    );
    let items = picker.items();
    println!("Assets ({}{}):", items.len(), if picker.no_more() { "" } else { "+" });
    for (index, asset) in items.iter().enumerate() {
        let marker = if picker.is_selected(index) { '*' } else { ' ' };
        println!(
            " {} {:>5}  {:<12} {}",
            marker,
            index,
            asset.group_name.as_deref().unwrap_or("-"),
            asset.filename.as_deref().unwrap_or(&asset.uri)
        );
    }

    let albums = picker.group_names();
    if !albums.is_empty() {
        println!();
        println!("Albums: {}", albums.join(", "));
    }

    println!();
    match picker.select_mode() {
        SelectMode::Single => println!("Selected (single):"),
        SelectMode::Multi { maximum } => {
            println!("Selected ({} of {}):", picker.selected_assets().len(), maximum)
        }
    }
    for (index, asset) in picker
        .selected_indices()
        .iter()
        .zip(picker.selected_assets())
    {
        println!("  [{}] {}", index, asset.uri);
    }
    for asset in picker.unresolved_selection() {
        println!("  [?] {} (not loaded)", asset.uri);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = cli::Settings::from_cli(cli)?;
    tracing::debug!(?settings, "Parsed settings");

    let source = Arc::new(LocalLibrary::new(&settings.directory));
    tracing::info!(root = %source.root().display(), "Browsing local library");
    let (mut picker, mut events) = Picker::new(settings.picker.clone(), source)?;
    let gate = DirectoryAccess::new(&settings.directory);

    match picker.start(&gate).await {
        Ok(()) => {}
        Err(e) if e.is_retryable() => {
            report(&mut events);
            load_next_with_retry(&mut picker, &settings.retry).await?;
        }
        Err(e) => {
            report(&mut events);
            return Err(e.into());
        }
    }
    report(&mut events);

    if settings.load_all {
        let shutdown_token = shutdown::install_signal_handler();
        while !picker.no_more() {
            if shutdown_token.is_cancelled() {
                tracing::info!(loaded = picker.items().len(), "Stopped paging early");
                break;
            }
            let applied = load_next_with_retry(&mut picker, &settings.retry).await;
            report(&mut events);
            if !applied? {
                break;
            }
        }
    }

    for &index in &settings.select {
        let Some(asset) = picker.items().get(index).cloned() else {
            tracing::warn!(index, loaded = picker.items().len(), "No asset at index, skipping");
            continue;
        };
        if picker.toggle(index, asset)? == ToggleOutcome::LimitReached {
            tracing::debug!(index, "Toggle rejected");
        }
        report(&mut events);
    }

    if settings.json {
        let out = serde_json::json!({
            "items": picker.items(),
            "selected": picker.selected_assets(),
            "selected_indices": picker.selected_indices(),
            "unresolved": picker.unresolved_selection(),
            "albums": picker.group_names(),
            "no_more": picker.no_more(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_text(&picker);
    }

    Ok(())
}
