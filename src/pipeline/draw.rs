use crate::types::Frame;

/// Flips the frame left to right in place.
pub fn mirror_horizontal(frame: &mut Frame) {
    let row_len = frame.width as usize * 3;
    if row_len == 0 {
        return;
    }
    for row in frame.rgb.chunks_exact_mut(row_len) {
        let (mut left, mut right) = (0usize, frame.width as usize - 1);
        while left < right {
            for c in 0..3 {
                row.swap(left * 3 + c, right * 3 + c);
            }
            left += 1;
            right -= 1;
        }
    }
}

pub fn draw_line(frame: &mut Frame, p0: (f32, f32), p1: (f32, f32), color: [u8; 3], thickness: i32) {
    let (mut x0, mut y0) = (p0.0 as i32, p0.1 as i32);
    let (x1, y1) = (p1.0 as i32, p1.1 as i32);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let radius = thickness.max(1) / 2;

    loop {
        stamp(frame, x0, y0, radius, color);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

pub fn draw_circle(frame: &mut Frame, center: (i32, i32), radius: i32, color: [u8; 3]) {
    let (cx, cy) = center;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put_pixel(frame, cx + dx, cy + dy, color);
            }
        }
    }
}

/// Outline of the box spanning `(x1, y1)` to `(x2, y2)` inclusive.
pub fn draw_rect(frame: &mut Frame, x1: i32, y1: i32, x2: i32, y2: i32, color: [u8; 3], thickness: i32) {
    let corners = [
        (x1 as f32, y1 as f32),
        (x2 as f32, y1 as f32),
        (x2 as f32, y2 as f32),
        (x1 as f32, y2 as f32),
    ];
    for i in 0..corners.len() {
        let next = corners[(i + 1) % corners.len()];
        draw_line(frame, corners[i], next, color, thickness);
    }
}

fn stamp(frame: &mut Frame, x: i32, y: i32, radius: i32, color: [u8; 3]) {
    if radius == 0 {
        put_pixel(frame, x, y, color);
        return;
    }
    for oy in -radius..=radius {
        for ox in -radius..=radius {
            if ox.abs() + oy.abs() <= radius {
                put_pixel(frame, x + ox, y + oy, color);
            }
        }
    }
}

pub fn put_pixel(frame: &mut Frame, x: i32, y: i32, color: [u8; 3]) {
    if x < 0 || y < 0 {
        return;
    }
    let (ux, uy) = (x as u32, y as u32);
    if ux >= frame.width || uy >= frame.height {
        return;
    }
    let idx = (uy as usize * frame.width as usize + ux as usize) * 3;
    if let Some(px) = frame.rgb.get_mut(idx..idx + 3) {
        px.copy_from_slice(&color);
    }
}
