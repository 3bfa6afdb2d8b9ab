use std::error::Error;
use std::io;
use std::time::Duration;

use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    MouseEventKind,
};
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::Terminal;
use tokio::sync::mpsc;

use crate::api;
use crate::core::chat_stream::{ChatStreamService, StreamParams};
use crate::core::config::Config;
use crate::core::session::{ChatSession, StreamPhase};
use crate::ui::{build_display_lines, draw, max_scroll_offset, wrapped_line_count, ChatUi};
use crate::utils::clipboard::copy_to_clipboard;
use crate::utils::logging::TranscriptLog;

pub struct RuntimeOptions {
    pub model_id: String,
    pub base_url: String,
    pub temperature: f32,
    /// `false` routes turns through the legacy non-streaming endpoint.
    pub streaming: bool,
    pub log_file: Option<String>,
    pub auth_token: Option<String>,
}

fn current_max_scroll<B: Backend>(
    terminal: &Terminal<B>,
    session: &ChatSession,
    ui: &ChatUi,
) -> u16 {
    let size = terminal.size().unwrap_or_default();
    // 3 rows of input area, 1 row of transcript title.
    let available_height = size.height.saturating_sub(4);
    // The transcript renders word-wrapped, so the bound counts wrapped rows.
    let total_rows = wrapped_line_count(&build_display_lines(session, ui), size.width);
    max_scroll_offset(total_rows, available_height)
}

pub async fn run_chat(opts: RuntimeOptions) -> Result<(), Box<dyn Error>> {
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    let mut session = ChatSession::new(opts.model_id.clone(), opts.temperature);
    let transcript = TranscriptLog::new(opts.log_file.clone())?;
    let (service, mut rx) = ChatStreamService::new();
    let (title_tx, mut title_rx) = mpsc::unbounded_channel::<String>();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let mut ui = ChatUi::new();

    let result = loop {
        terminal.draw(|f| draw(f, &session, &ui))?;

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        break Ok(());
                    }
                    KeyCode::Esc => {
                        if session.cancel() {
                            ui.status = Some("response cancelled".to_string());
                        }
                    }
                    KeyCode::Enter => {
                        let Some(turn) = session.submit(&ui.input) else {
                            continue;
                        };
                        ui.input.clear();
                        ui.auto_scroll = true;
                        ui.status = None;

                        if let Err(e) = transcript.log_user(&turn.request.user_input) {
                            tracing::warn!(%e, "transcript write failed");
                        }

                        let params = StreamParams {
                            client: client.clone(),
                            base_url: opts.base_url.clone(),
                            auth_token: opts.auth_token.clone(),
                            request: turn.request,
                            cancel_token: turn.cancel_token,
                            stream_id: turn.stream_id,
                        };
                        if opts.streaming {
                            service.spawn_stream(params);
                        } else {
                            service.spawn_fallback(params);
                        }
                    }
                    KeyCode::Char('y') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        if let Some(turn) = session.conversation().last() {
                            if !turn.ai_message.is_empty() {
                                match copy_to_clipboard(&turn.ai_message) {
                                    Ok(()) => ui.status = Some("reply copied".to_string()),
                                    Err(e) => tracing::warn!(%e, "clipboard write failed"),
                                }
                            }
                        }
                    }
                    KeyCode::Char('p') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        if let Some(model) = session.cycle_model() {
                            let tier = if model.premium { " (premium)" } else { "" };
                            ui.status = Some(format!("model: {}{tier}", model.label));
                            if let Err(e) = Config::persist_default_model(model.id) {
                                tracing::warn!(%e, "failed to persist model selection");
                            }
                        }
                    }
                    KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                        ui.input.push(c);
                    }
                    KeyCode::Backspace => {
                        ui.input.pop();
                    }
                    KeyCode::Up => {
                        ui.auto_scroll = false;
                        ui.scroll_offset = ui.scroll_offset.saturating_sub(1);
                    }
                    KeyCode::Down => {
                        let max = current_max_scroll(&terminal, &session, &ui);
                        ui.scroll_offset = ui.scroll_offset.saturating_add(1).min(max);
                        if ui.scroll_offset >= max {
                            ui.auto_scroll = true;
                        }
                    }
                    _ => {}
                },
                Event::Mouse(mouse) => match mouse.kind {
                    MouseEventKind::ScrollUp => {
                        ui.auto_scroll = false;
                        ui.scroll_offset = ui.scroll_offset.saturating_sub(3);
                    }
                    MouseEventKind::ScrollDown => {
                        let max = current_max_scroll(&terminal, &session, &ui);
                        ui.scroll_offset = ui.scroll_offset.saturating_add(3).min(max);
                        if ui.scroll_offset >= max {
                            ui.auto_scroll = true;
                        }
                    }
                    _ => {}
                },
                _ => {}
            }
        }

        while let Ok(title) = title_rx.try_recv() {
            ui.title = Some(title);
        }

        // Drain stream events; all session mutation happens here, on this
        // task, in arrival order.
        let mut received_any = false;
        while let Ok((stream_event, stream_id)) = rx.try_recv() {
            let was_generating = session.is_generating();
            if !session.apply(stream_event, stream_id) {
                continue;
            }
            received_any = true;

            if was_generating && !session.is_generating() {
                if let Some(turn) = session.conversation().last() {
                    if let Err(e) = transcript.log_assistant(&turn.ai_message) {
                        tracing::warn!(%e, "transcript write failed");
                    }
                }

                match session.phase() {
                    StreamPhase::Errored => {
                        ui.status = session.last_error().map(str::to_string);
                    }
                    StreamPhase::Closed
                        if ui.title.is_none() && session.conversation().len() == 1 =>
                    {
                        spawn_title_fetch(&client, &opts, &session, title_tx.clone());
                    }
                    _ => {}
                }
            }
        }

        if received_any {
            if ui.auto_scroll {
                ui.scroll_offset = current_max_scroll(&terminal, &session, &ui);
            }
            continue;
        }
    };

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

/// Fire-and-forget title generation once the first exchange closes. Failures
/// are logged and the header keeps its default.
fn spawn_title_fetch(
    client: &reqwest::Client,
    opts: &RuntimeOptions,
    session: &ChatSession,
    title_tx: mpsc::UnboundedSender<String>,
) {
    let client = client.clone();
    let base_url = opts.base_url.clone();
    let auth_token = opts.auth_token.clone();
    let history = session.conversation().snapshot();

    tokio::spawn(async move {
        match api::title::fetch_chat_title(&client, &base_url, auth_token.as_deref(), history)
            .await
        {
            Ok(title) if !title.is_empty() => {
                let _ = title_tx.send(title);
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(%e, "chat title generation failed"),
        }
    });
}
