use gtk::prelude::*;
use gtk::{glib, Application};
use libadwaita::{prelude::*, ApplicationWindow, ColorScheme, HeaderBar, StyleManager, ToolbarView};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod countries;
mod country_view;
mod data;
mod images;
mod map_view;
mod selection;

use config::Settings;
use country_view::create_country_view;
use data::APP_ID;

fn main() -> glib::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // reqwest needs a Tokio reactor even though futures run on the GLib main loop
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to start async runtime");
            return glib::ExitCode::FAILURE;
        }
    };
    let _guard = rt.enter();

    let settings = Settings::load();
    info!(dataset = %settings.dataset_url, zoom = settings.zoom_level, "starting");

    let client = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|e| {
            error!(error = %e, "falling back to default http client");
            reqwest::Client::new()
        });

    let app = Application::builder()
        .application_id(APP_ID)
        .build();

    app.connect_activate(move |app| build_ui(app, &settings, &client));

    // GTK would otherwise try to parse our arguments
    let exit_code = app.run_with_args::<&str>(&[]);

    // Keep runtime alive until app exits
    drop(_guard);
    drop(rt);

    exit_code
}

fn build_ui(app: &Application, settings: &Settings, client: &reqwest::Client) {
    let style_manager = StyleManager::default();
    style_manager.set_color_scheme(ColorScheme::PreferDark);

    let header_bar = HeaderBar::builder()
        .build();

    let toolbar_view = ToolbarView::builder()
        .build();
    toolbar_view.add_top_bar(&header_bar);
    toolbar_view.set_content(Some(&create_country_view(settings, client)));

    let window = ApplicationWindow::builder()
        .application(app)
        .title("Worldview")
        .default_width(1000)
        .default_height(700)
        .build();

    let css_provider = gtk::CssProvider::new();
    css_provider.load_from_data(
        ".map-marker {
            padding: 0;
            min-height: 0;
            min-width: 0;
            background: none;
        }
        .map-popover > contents {
            background-color: alpha(@card_bg_color, 0.95);
            border-radius: 12px;
            box-shadow: 0 4px 16px alpha(black, 0.6);
        }
        .country-flag {
            border-radius: 6px;
            box-shadow: 0 2px 6px alpha(black, 0.4);
        }
        .country-info .heading {
            color: alpha(@window_fg_color, 0.7);
        }"
    );

    gtk::style_context_add_provider_for_display(
        &gtk::prelude::WidgetExt::display(&window),
        &css_provider,
        gtk::STYLE_PROVIDER_PRIORITY_APPLICATION,
    );

    window.set_content(Some(&toolbar_view));
    window.present();
}
