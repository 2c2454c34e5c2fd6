use super::{
    AnyElement, AppView, Button, ButtonVariants, Context, FitRect, HEADER_TITLE, IntoElement,
    LABEL_FONT_SIZE, ObjectFit, OverlayLabel, ParentElement, SharedString, Styled, StyledExt,
    StyledImage, VIDEO_SIZE, contain_fit, div, h_flex, img, label_color, px, v_flex,
};
use crate::toggle::INITIAL_STATUS;

impl AppView {
    pub(super) fn render_main(&mut self, cx: &mut Context<'_, Self>) -> AnyElement {
        let status = self
            .driver
            .as_ref()
            .map(|driver| driver.status())
            .unwrap_or(INITIAL_STATUS);

        let header = div()
            .w_full()
            .py_3()
            .bg(gpui::rgb(0x333333))
            .text_color(gpui::rgb(0xffffff))
            .text_xl()
            .font_semibold()
            .flex()
            .justify_center()
            .child(HEADER_TITLE);

        let controls = h_flex()
            .gap_3()
            .justify_center()
            .child(
                Button::new(SharedString::from("start-detection"))
                    .primary()
                    .label("▶ Start Detection")
                    .on_click(cx.listener(|this, _, _, cx| {
                        this.start_detection();
                        cx.notify();
                    })),
            )
            .child(
                Button::new(SharedString::from("stop-detection"))
                    .outline()
                    .label("⏸ Stop Detection")
                    .on_click(cx.listener(|this, _, _, cx| {
                        this.stop_detection();
                        cx.notify();
                    })),
            )
            .child(
                Button::new(SharedString::from("exit-application"))
                    .danger()
                    .label("❌ Exit Application")
                    .on_click(cx.listener(|this, _, window, cx| {
                        this.exit_application(window, cx);
                    })),
            );

        v_flex()
            .size_full()
            .items_center()
            .gap_3()
            .bg(gpui::rgb(0x1e1e1e))
            .child(header)
            .child(self.render_video())
            .child(
                div()
                    .text_base()
                    .text_color(gpui::rgb(0x00ffcc))
                    .child(status),
            )
            .child(controls)
            .into_any_element()
    }

    fn render_video(&self) -> AnyElement {
        let (width, height) = VIDEO_SIZE;
        let mut surface = div()
            .relative()
            .w(px(width))
            .h(px(height))
            .overflow_hidden()
            .bg(gpui::rgb(0x000000));

        let Some(image) = &self.latest_image else {
            return surface
                .flex()
                .items_center()
                .justify_center()
                .text_sm()
                .text_color(gpui::rgb(0x8b95a5))
                .child("Press Start to open the video")
                .into_any_element();
        };

        surface = surface.child(
            img(image.clone())
                .size_full()
                .object_fit(ObjectFit::Contain),
        );

        let fit = contain_fit(VIDEO_SIZE, self.latest_size);
        for label in &self.latest_labels {
            surface = surface.child(overlay_label(label, &fit));
        }

        surface.into_any_element()
    }
}

/// Places a label so its baseline sits at the label's frame position.
fn overlay_label(label: &OverlayLabel, fit: &FitRect) -> AnyElement {
    let (x, y) = fit.map(label.x as f32, label.y as f32);
    div()
        .absolute()
        .left(px(x))
        .top(px(y - LABEL_FONT_SIZE))
        .text_size(px(LABEL_FONT_SIZE))
        .line_height(px(LABEL_FONT_SIZE))
        .whitespace_nowrap()
        .text_color(label_color(label.color))
        .child(label.text.clone())
        .into_any_element()
}
