use assistant_runtime::create_runtime;
use assistant_shell::app::{
    AssistantShell, ClosePanel, NewThread, Quit, TogglePanel, bind_shell_actions,
};
use assistant_shell::settings::{default_settings_path, load_or_default};
use gpui::*;
use gpui_component::Root;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "assistant_shell=info,assistant_runtime=info";

/// Application entry point.
///
/// Bootstraps the shell with:
/// 1. A `tracing` subscriber filtered by `RUST_LOG` or the default filter
/// 2. Settings from defaults, the settings file, and the environment
/// 3. The tokio bridge and gpui-component initialization, then the configured theme
/// 4. Key bindings for the shell actions
/// 5. The main window, whose shell receives the runtime or the factory error
fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = load_or_default(&default_settings_path());
    let app = Application::new().with_assets(gpui_component_assets::Assets);

    app.run(move |cx| {
        gpui_tokio_bridge::init(cx);
        gpui_component::init(cx);
        settings.apply_theme(cx);

        cx.bind_keys([
            KeyBinding::new("cmd-b", TogglePanel, None),
            KeyBinding::new("ctrl-b", TogglePanel, None),
            KeyBinding::new("escape", ClosePanel, None),
            KeyBinding::new("cmd-n", NewThread, None),
            KeyBinding::new("cmd-q", Quit, None),
        ]);

        cx.spawn(async move |cx| {
            cx.update(|cx| {
                let options = WindowOptions {
                    window_bounds: Some(WindowBounds::Windowed(Bounds::centered(
                        None,
                        size(px(1200.), px(800.)),
                        cx,
                    ))),
                    titlebar: Some(TitlebarOptions {
                        title: Some(SharedString::from(settings.title.clone())),
                        ..Default::default()
                    }),
                    ..Default::default()
                };

                cx.open_window(options, |window, cx| {
                    let shell = cx.new(|cx| {
                        let mut shell = AssistantShell::new(settings.title.clone(), window, cx);
                        match create_runtime(settings.runtime_config()) {
                            Ok(runtime) => {
                                tracing::info!(
                                    runtime = ?runtime.id(),
                                    provider = %runtime.provider_name(),
                                    model_id = %runtime.model_id(),
                                    "chat runtime created"
                                );
                                shell.set_runtime(Some(runtime), cx);
                            }
                            Err(error) => {
                                tracing::error!(
                                    stage = error.stage(),
                                    error = %error,
                                    "failed to create chat runtime"
                                );
                                shell.show_error(error.to_string(), cx);
                            }
                        }
                        shell
                    });
                    bind_shell_actions(shell.downgrade(), cx);

                    cx.new(|cx| Root::new(shell, window, cx))
                })
                .expect("failed to open main window");

                cx.activate(true);
            })
        })
        .detach();
    });
}
