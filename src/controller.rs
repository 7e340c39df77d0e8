use nalgebra as na;

use crate::region::{DragState, RegionRegistry};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Press(na::Point2<f32>),
    Move(na::Point2<f32>),
    Release(na::Point2<f32>),
}

impl PointerEvent {
    #[inline]
    pub fn press(x: f32, y: f32) -> Self {
        PointerEvent::Press(na::Point2::new(x, y))
    }

    #[inline]
    pub fn moved(x: f32, y: f32) -> Self {
        PointerEvent::Move(na::Point2::new(x, y))
    }

    #[inline]
    pub fn release(x: f32, y: f32) -> Self {
        PointerEvent::Release(na::Point2::new(x, y))
    }
}

/// Turns pointer presses, moves and releases into region drags.
///
/// Holds the only [`DragState`]; at most one region is ever being dragged.
#[derive(Debug, Clone, Default)]
pub struct InteractionController {
    drag: Option<DragState>,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn drag(&self) -> Option<&DragState> {
        self.drag.as_ref()
    }

    pub fn handle(&mut self, registry: &mut RegionRegistry, event: PointerEvent) {
        match event {
            PointerEvent::Press(p) => self.press(registry, p),
            PointerEvent::Move(p) => {
                if let Some(drag) = self.drag.as_mut() {
                    registry.update_drag(drag, p);
                }
            }
            PointerEvent::Release(_) => registry.end_drag(&mut self.drag),
        }
    }

    fn press(&mut self, registry: &mut RegionRegistry, p: na::Point2<f32>) {
        let hit = match registry.find_region_at(p) {
            Some(hit) => hit,
            None => return,
        };

        match self.drag {
            // lost release: pressing the same region again restarts the anchor
            Some(ref mut drag) if drag.region == hit => drag.anchor = p,
            Some(_) => {}
            None => self.drag = registry.begin_drag(hit, p),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::Region;

    fn registry() -> RegionRegistry {
        let a = Region::new(
            "A",
            &[[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]],
            [0, 0, 0],
            [0, 0, 0],
        )
        .unwrap();
        let b = Region::new(
            "B",
            &[[20.0, 0.0], [30.0, 0.0], [30.0, 10.0], [20.0, 10.0]],
            [0, 0, 0],
            [0, 0, 0],
        )
        .unwrap();

        RegionRegistry::new(vec![a, b]).unwrap()
    }

    #[test]
    fn drag_moves_only_the_pressed_region() {
        let mut registry = registry();
        let mut controller = InteractionController::new();
        let b_before = registry.get(1).unwrap().polygon.clone();

        controller.handle(&mut registry, PointerEvent::press(5.0, 5.0));
        // pointer sweeps across B while A is held
        controller.handle(&mut registry, PointerEvent::moved(15.0, 5.0));
        controller.handle(&mut registry, PointerEvent::moved(25.0, 5.0));
        controller.handle(&mut registry, PointerEvent::release(25.0, 5.0));

        assert_eq!(registry.get(0).unwrap().polygon.first(), na::Point2::new(20.0, 0.0));
        assert_eq!(registry.get(1).unwrap().polygon, b_before);
        assert!(controller.drag().is_none());
        assert_eq!(registry.dragging_count(), 0);
    }

    #[test]
    fn move_without_press_is_ignored() {
        let mut registry = registry();
        let before = registry.get(0).unwrap().polygon.clone();
        let mut controller = InteractionController::new();

        controller.handle(&mut registry, PointerEvent::moved(5.0, 5.0));
        controller.handle(&mut registry, PointerEvent::moved(7.0, 9.0));
        controller.handle(&mut registry, PointerEvent::release(7.0, 9.0));

        assert_eq!(registry.get(0).unwrap().polygon, before);
    }

    #[test]
    fn press_outside_regions_starts_nothing() {
        let mut registry = registry();
        let mut controller = InteractionController::new();

        controller.handle(&mut registry, PointerEvent::press(15.0, 50.0));

        assert!(controller.drag().is_none());
        assert_eq!(registry.dragging_count(), 0);
    }

    #[test]
    fn second_press_on_other_region_is_ignored() {
        let mut registry = registry();
        let mut controller = InteractionController::new();

        controller.handle(&mut registry, PointerEvent::press(5.0, 5.0));
        controller.handle(&mut registry, PointerEvent::press(25.0, 5.0));

        assert_eq!(controller.drag().map(|d| d.region), Some(0));
        assert_eq!(registry.dragging_count(), 1);
    }

    #[test]
    fn repeated_press_restarts_anchor() {
        let mut registry = registry();
        let mut controller = InteractionController::new();

        controller.handle(&mut registry, PointerEvent::press(5.0, 5.0));
        controller.handle(&mut registry, PointerEvent::press(8.0, 8.0));
        controller.handle(&mut registry, PointerEvent::moved(9.0, 8.0));

        assert_eq!(registry.get(0).unwrap().polygon.first(), na::Point2::new(1.0, 0.0));
    }
}
