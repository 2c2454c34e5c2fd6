use super::{
    ActiveTheme, AnyElement, AppView, Context, DownloadMessage, DownloadState, IntoElement,
    ModelDownloadEvent, ModelKind, ModelPaths, OrtPerception, ParentElement, PerceptionConfig,
    Sender, Styled, StyledExt, Tag, div, ensure_model_ready, h_flex, thread, v_flex,
};

impl AppView {
    /// Drains setup messages; returns the perception backend once it is built.
    pub(super) fn poll_download_events(
        &mut self,
        state: &mut DownloadState,
    ) -> Option<OrtPerception> {
        while let Ok(msg) = self.download_rx.try_recv() {
            match msg {
                DownloadMessage::Event(ModelDownloadEvent::AlreadyPresent { model }) => {
                    state.current = Some(model);
                    state.message = format!("{} model already present", model.label());
                }
                DownloadMessage::Event(ModelDownloadEvent::Missing { model }) => {
                    state.message = format!(
                        "{} model not found, continuing without it",
                        model.label()
                    );
                }
                DownloadMessage::Event(ModelDownloadEvent::Started { model, total }) => {
                    state.current = Some(model);
                    state.downloaded = 0;
                    state.total = total;
                    state.message = format!("Downloading {} model...", model.label());
                }
                DownloadMessage::Event(ModelDownloadEvent::Progress {
                    model,
                    downloaded,
                    total,
                }) => {
                    state.current = Some(model);
                    state.downloaded = downloaded;
                    state.total = total;
                }
                DownloadMessage::Event(ModelDownloadEvent::Finished { model }) => {
                    state.message = format!("{} model ready", model.label());
                }
                DownloadMessage::Ready(perception) => {
                    state.message = "Models loaded, opening camera...".to_string();
                    return Some(*perception);
                }
                DownloadMessage::Error(err) => {
                    state.error = Some(err);
                    state.message = "Model setup failed".to_string();
                }
            }
        }
        None
    }

    pub(super) fn render_download_view(
        &self,
        state: &DownloadState,
        cx: &mut Context<'_, Self>,
    ) -> AnyElement {
        let theme = cx.theme();
        let bar = progress_bar_string(state.downloaded, state.total);
        let detail = match (state.current, state.total) {
            (Some(model), Some(total)) if total > 0 => {
                let percent = (state.downloaded as f64 / total as f64 * 100.0).clamp(0.0, 100.0);
                format!("{}: {percent:.1}%", model.label())
            }
            (Some(model), _) => format!("{}: {} KB", model.label(), state.downloaded / 1024),
            (None, _) => "Checking model files".to_string(),
        };

        let (status_icon, status_text, status_color) = if state.error.is_some() {
            ("✗", "Model setup failed", theme.danger)
        } else {
            ("⟳", "Preparing models", theme.foreground)
        };

        let mut container = v_flex()
            .gap_3()
            .p_6()
            .rounded_lg()
            .border_1()
            .border_color(theme.border)
            .bg(theme.group_box)
            .child(
                h_flex()
                    .gap_2()
                    .items_center()
                    .child(
                        div()
                            .text_color(status_color)
                            .font_semibold()
                            .child(format!("{status_icon} {status_text}")),
                    )
                    .child(
                        div()
                            .text_sm()
                            .text_color(theme.muted_foreground)
                            .child("hand and face models"),
                    ),
            )
            .child(
                div()
                    .px_3()
                    .py_2()
                    .rounded_md()
                    .border_1()
                    .border_color(theme.border)
                    .bg(theme.muted)
                    .font_family(theme.mono_font_family.clone())
                    .text_color(theme.foreground)
                    .child(bar),
            )
            .child(
                div()
                    .text_sm()
                    .text_color(theme.muted_foreground)
                    .child(detail),
            )
            .child(
                div()
                    .text_color(theme.foreground)
                    .child(state.message.clone()),
            );

        if let Some(err) = &state.error {
            container = container.child(Tag::danger().rounded_full().child(format!("Error: {err}")));
        }

        v_flex()
            .size_full()
            .items_center()
            .justify_center()
            .bg(theme.background)
            .child(container)
            .into_any_element()
    }

    pub(super) fn render_failure(&self, message: &str, cx: &mut Context<'_, Self>) -> AnyElement {
        let theme = cx.theme();
        v_flex()
            .size_full()
            .items_center()
            .justify_center()
            .bg(theme.background)
            .child(
                Tag::danger()
                    .rounded_full()
                    .child(message.to_string()),
            )
            .into_any_element()
    }
}

/// Fetches every model in turn, then loads the perception backend off the UI thread.
pub(super) fn spawn_model_setup(
    paths: ModelPaths,
    config: PerceptionConfig,
    tx: Sender<DownloadMessage>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let models = [
            (ModelKind::PalmDetector, &paths.palm_detector),
            (ModelKind::HandposeEstimator, &paths.handpose_estimator),
            (ModelKind::FaceDetector, &paths.face_detector),
            (ModelKind::FaceMesh, &paths.face_mesh),
        ];

        for (kind, path) in models {
            let result = ensure_model_ready(kind, path, |event| {
                let _ = tx.send(DownloadMessage::Event(event));
            });
            if let Err(err) = result {
                log::error!("failed to prepare {} model: {err:?}", kind.label());
                let _ = tx.send(DownloadMessage::Error(format!("{err:#}")));
                return;
            }
        }

        match OrtPerception::new(&paths, &config) {
            Ok(perception) => {
                log::info!("models ready");
                let _ = tx.send(DownloadMessage::Ready(Box::new(perception)));
            }
            Err(err) => {
                log::error!("failed to load models: {err:?}");
                let _ = tx.send(DownloadMessage::Error(format!("{err:#}")));
            }
        }
    })
}

fn progress_bar_string(downloaded: u64, total: Option<u64>) -> String {
    const BAR_LEN: usize = 30;
    match total {
        Some(total) if total > 0 => {
            let pct = (downloaded as f64 / total as f64).clamp(0.0, 1.0);
            let filled = ((pct * BAR_LEN as f64).round() as usize).min(BAR_LEN);
            let empty = BAR_LEN.saturating_sub(filled);
            format!(
                "[{}{}] {:>5.1}%",
                "=".repeat(filled),
                " ".repeat(empty),
                pct * 100.0
            )
        }
        _ => {
            let spinner_width = ((downloaded / 64) as usize % BAR_LEN) + 1;
            format!(
                "[{:-<width$}] unknown size",
                ">",
                width = spinner_width.min(BAR_LEN)
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::progress_bar_string;

    #[test]
    fn known_size_fills_proportionally() {
        let bar = progress_bar_string(50, Some(100));
        assert!(bar.starts_with(&format!("[{}{}]", "=".repeat(15), " ".repeat(15))));
        assert!(bar.ends_with(" 50.0%"));
    }

    #[test]
    fn unknown_size_shows_a_spinner() {
        assert_eq!(progress_bar_string(0, None), "[>] unknown size");
        assert!(progress_bar_string(1_000_000, Some(0)).ends_with("unknown size"));
    }
}
