//! 화면 좌표계 직사각형.

use serde::{Deserialize, Serialize};

/// 직사각형 영역 (좌상단 + 크기)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    /// 좌측 X
    pub x: i32,
    /// 상단 Y
    pub y: i32,
    /// 너비
    pub width: u32,
    /// 높이
    pub height: u32,
}

impl Rect {
    /// 새 직사각형
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// 우측 경계 (exclusive)
    pub fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    /// 하단 경계 (exclusive)
    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    /// 면적 0 여부
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// 중심 좌표
    pub fn center(&self) -> (f64, f64) {
        (
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }

    /// 점 포함 여부 (우/하단 경계 제외)
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x as f64
            && py >= self.y as f64
            && px < self.right() as f64
            && py < self.bottom() as f64
    }

    /// 교집합. 겹치지 않으면 `None`
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let left = (self.x as i64).max(other.x as i64);
        let top = (self.y as i64).max(other.y as i64);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            return None;
        }
        Some(Rect::new(
            left as i32,
            top as i32,
            (right - left) as u32,
            (bottom - top) as u32,
        ))
    }

    /// 두 영역을 모두 덮는 최소 직사각형
    pub fn union(&self, other: &Rect) -> Rect {
        let left = (self.x as i64).min(other.x as i64);
        let top = (self.y as i64).min(other.y as i64);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(
            left as i32,
            top as i32,
            (right - left) as u32,
            (bottom - top) as u32,
        )
    }

    /// 여러 영역의 합집합 경계. 비어 있으면 `None`
    pub fn bounding<'a, I>(rects: I) -> Option<Rect>
    where
        I: IntoIterator<Item = &'a Rect>,
    {
        rects.into_iter().fold(None, |acc, r| match acc {
            None => Some(*r),
            Some(b) => Some(b.union(r)),
        })
    }

    /// 두 꼭짓점(순서 무관)에서 정규화된 직사각형 생성. 크기는 최소 1
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Rect {
        let left = x1.min(x2).round();
        let top = y1.min(y2).round();
        let width = (x2 - x1).abs().round().max(1.0);
        let height = (y2 - y1).abs().round().max(1.0);
        Rect::new(left as i32, top as i32, width as u32, height as u32)
    }

    /// `bounds` 중앙에 놓인 `width`×`height` 영역 (bounds보다 크면 bounds에 맞춤)
    pub fn centered_in(bounds: &Rect, width: u32, height: u32) -> Rect {
        let w = width.min(bounds.width).max(1);
        let h = height.min(bounds.height).max(1);
        let x = bounds.x as i64 + (bounds.width as i64 - w as i64) / 2;
        let y = bounds.y as i64 + (bounds.height as i64 - h as i64) / 2;
        Rect::new(x as i32, y as i32, w, h)
    }
}
