//! Minimal deterministic physics world
//!
//! Circles fall under gravity inside a box built from static rectangles.
//! Good enough to drive the merge rules in tests, the native autoplay demo
//! and the browser build. A full rigid-body engine can replace it behind
//! `PhysicsWorld` without touching the game core.

use glam::Vec2;

use super::physics::{BodyDesc, BodyHandle, BodyView, CollisionPair, PhysicsWorld};
use crate::GameConfig;
use crate::consts::GRAVITY;
use crate::sim::geometry::bounding_radius;

/// Position correction passes per step
const SOLVER_ITERATIONS: usize = 4;
/// Bodies closer than this count as touching
const CONTACT_SLOP: f32 = 0.5;
/// Per-step velocity damping so stacks settle
const LINEAR_DAMPING: f32 = 0.995;

#[derive(Debug, Clone)]
enum Collider {
    Circle { radius: f32 },
    /// Axis-aligned box, half extents
    Rect { half: Vec2 },
}

#[derive(Debug, Clone)]
struct SimBody {
    handle: BodyHandle,
    pos: Vec2,
    vel: Vec2,
    collider: Collider,
    circle_radius: Option<f32>,
    is_static: bool,
    is_sensor: bool,
    restitution: f32,
    in_world: bool,
}

impl SimBody {
    fn view(&self) -> BodyView {
        BodyView {
            handle: self.handle,
            position: self.pos,
            circle_radius: self.circle_radius,
            is_static: self.is_static,
        }
    }

    fn mass(&self) -> f32 {
        match self.collider {
            Collider::Circle { radius } => radius * radius,
            Collider::Rect { half } => half.x * half.y * 4.0,
        }
    }
}

/// Result of an overlap test (normal points from `a` toward `b`)
#[derive(Debug, Clone, Copy)]
struct Contact {
    normal: Vec2,
    /// Positive when overlapping, negative when apart
    penetration: f32,
}

fn circle_circle(a: Vec2, ra: f32, b: Vec2, rb: f32) -> Contact {
    let delta = b - a;
    let dist = delta.length();
    let normal = if dist > 1e-6 { delta / dist } else { Vec2::Y };
    Contact {
        normal,
        penetration: ra + rb - dist,
    }
}

/// Circle at `c` against a box centered at `center`; normal points box -> circle
fn rect_circle(center: Vec2, half: Vec2, c: Vec2, r: f32) -> Contact {
    let local = c - center;
    let closest = local.clamp(-half, half);
    let delta = local - closest;
    let dist = delta.length();
    if dist > 1e-6 {
        return Contact {
            normal: delta / dist,
            penetration: r - dist,
        };
    }
    // Circle center inside the box: push out along the shallowest axis
    let dx = half.x - local.x.abs();
    let dy = half.y - local.y.abs();
    if dx < dy {
        Contact {
            normal: Vec2::new(local.x.signum(), 0.0),
            penetration: r + dx,
        }
    } else {
        Contact {
            normal: Vec2::new(0.0, local.y.signum()),
            penetration: r + dy,
        }
    }
}

/// Simple circle physics implementing the engine collaborator
#[derive(Debug, Clone)]
pub struct HeadlessWorld {
    bodies: Vec<SimBody>,
    gravity: Vec2,
    /// Touching pairs after the previous step (sorted, low id first)
    contacts: Vec<(BodyHandle, BodyHandle)>,
    next_id: u32,
}

impl Default for HeadlessWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessWorld {
    pub fn new() -> Self {
        Self {
            bodies: Vec::new(),
            gravity: Vec2::new(0.0, GRAVITY),
            contacts: Vec::new(),
            next_id: 1,
        }
    }

    /// World with floor and side walls matching the container
    pub fn with_container(config: &GameConfig) -> Self {
        let mut world = Self::new();
        let w = config.container_width;
        let h = config.container_height;
        let pad = config.wall_pad;

        // Floor plus two side walls, extending well above the canvas
        let walls = [
            (Vec2::new(w / 2.0, h + pad / 2.0), Vec2::new(w / 2.0, pad / 2.0)),
            (Vec2::new(pad / 2.0, h / 2.0), Vec2::new(pad / 2.0, h)),
            (Vec2::new(w - pad / 2.0, h / 2.0), Vec2::new(pad / 2.0, h)),
        ];
        for (center, half) in walls {
            let handle = world.create_body(BodyDesc {
                vertices: vec![
                    Vec2::new(-half.x, -half.y),
                    Vec2::new(half.x, -half.y),
                    Vec2::new(half.x, half.y),
                    Vec2::new(-half.x, half.y),
                ],
                position: center,
                circle_radius: None,
                is_static: true,
                is_sensor: false,
                friction: 0.0,
                restitution: 0.0,
            });
            world.add_body(handle);
        }
        world
    }

    pub fn set_gravity(&mut self, gravity: Vec2) {
        self.gravity = gravity;
    }

    fn active(&self) -> impl Iterator<Item = &SimBody> {
        self.bodies.iter().filter(|b| b.in_world && !b.is_sensor)
    }

    fn contact_between(a: &SimBody, b: &SimBody) -> Option<Contact> {
        match (&a.collider, &b.collider) {
            (Collider::Circle { radius: ra }, Collider::Circle { radius: rb }) => {
                Some(circle_circle(a.pos, *ra, b.pos, *rb))
            }
            (Collider::Rect { half }, Collider::Circle { radius }) => {
                Some(rect_circle(a.pos, *half, b.pos, *radius))
            }
            (Collider::Circle { radius }, Collider::Rect { half }) => {
                let c = rect_circle(b.pos, *half, a.pos, *radius);
                Some(Contact {
                    normal: -c.normal,
                    penetration: c.penetration,
                })
            }
            // Static boxes never touch each other meaningfully
            (Collider::Rect { .. }, Collider::Rect { .. }) => None,
        }
    }

    /// Push one overlapping pair apart and remove approaching velocity
    fn resolve_pair(&mut self, i: usize, j: usize) {
        let (a, b) = (&self.bodies[i], &self.bodies[j]);
        if a.is_static && b.is_static {
            return;
        }
        let Some(contact) = Self::contact_between(a, b) else {
            return;
        };
        if contact.penetration <= 0.0 {
            return;
        }

        let inv_a = if a.is_static { 0.0 } else { 1.0 / a.mass() };
        let inv_b = if b.is_static { 0.0 } else { 1.0 / b.mass() };
        let inv_sum = inv_a + inv_b;
        let correction = contact.normal * (contact.penetration / inv_sum);

        let rel_vel = b.vel - a.vel;
        let vn = rel_vel.dot(contact.normal);
        let impulse = if vn < 0.0 {
            let e = a.restitution.max(b.restitution);
            contact.normal * (-(1.0 + e) * vn / inv_sum)
        } else {
            Vec2::ZERO
        };

        let a = &mut self.bodies[i];
        a.pos -= correction * inv_a;
        a.vel -= impulse * inv_a;
        let b = &mut self.bodies[j];
        b.pos += correction * inv_b;
        b.vel += impulse * inv_b;
    }

    /// Currently touching pairs, sorted by handle
    fn touching_pairs(&self) -> Vec<(BodyHandle, BodyHandle)> {
        let active: Vec<&SimBody> = self.active().collect();
        let mut pairs = Vec::new();
        for (i, a) in active.iter().enumerate() {
            for b in &active[i + 1..] {
                if a.is_static && b.is_static {
                    continue;
                }
                let touching = Self::contact_between(a, b)
                    .is_some_and(|c| c.penetration > -CONTACT_SLOP);
                if touching {
                    let pair = if a.handle < b.handle {
                        (a.handle, b.handle)
                    } else {
                        (b.handle, a.handle)
                    };
                    pairs.push(pair);
                }
            }
        }
        pairs.sort();
        pairs
    }
}

impl PhysicsWorld for HeadlessWorld {
    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let handle = BodyHandle(self.next_id);
        self.next_id += 1;

        let collider = match desc.circle_radius {
            Some(radius) => Collider::Circle { radius },
            None if desc.is_static => {
                let max = desc
                    .vertices
                    .iter()
                    .fold(Vec2::ZERO, |acc, v| acc.max(v.abs()));
                Collider::Rect { half: max }
            }
            None => Collider::Circle {
                radius: bounding_radius(&desc.vertices),
            },
        };

        self.bodies.push(SimBody {
            handle,
            pos: desc.position,
            vel: Vec2::ZERO,
            collider,
            circle_radius: desc.circle_radius,
            is_static: desc.is_static,
            is_sensor: desc.is_sensor,
            restitution: desc.restitution,
            in_world: false,
        });
        handle
    }

    fn add_body(&mut self, handle: BodyHandle) {
        if let Some(body) = self.bodies.iter_mut().find(|b| b.handle == handle) {
            body.in_world = true;
        }
    }

    fn remove_body(&mut self, handle: BodyHandle) {
        self.bodies.retain(|b| b.handle != handle);
        self.contacts.retain(|&(a, b)| a != handle && b != handle);
    }

    fn body(&self, handle: BodyHandle) -> Option<BodyView> {
        self.bodies
            .iter()
            .find(|b| b.handle == handle && b.in_world)
            .map(SimBody::view)
    }

    fn bodies(&self) -> Vec<BodyHandle> {
        self.bodies
            .iter()
            .filter(|b| b.in_world)
            .map(|b| b.handle)
            .collect()
    }

    fn set_position(&mut self, handle: BodyHandle, position: Vec2) {
        if let Some(body) = self.bodies.iter_mut().find(|b| b.handle == handle) {
            body.pos = position;
        }
    }

    fn step(&mut self, dt: f32) -> Vec<CollisionPair> {
        let gravity = self.gravity;
        for body in self
            .bodies
            .iter_mut()
            .filter(|b| b.in_world && !b.is_static && !b.is_sensor)
        {
            body.vel += gravity * dt;
            body.vel *= LINEAR_DAMPING;
            body.pos += body.vel * dt;
        }

        let active: Vec<usize> = (0..self.bodies.len())
            .filter(|&i| self.bodies[i].in_world && !self.bodies[i].is_sensor)
            .collect();
        for _ in 0..SOLVER_ITERATIONS {
            for (n, &i) in active.iter().enumerate() {
                for &j in &active[n + 1..] {
                    self.resolve_pair(i, j);
                }
            }
        }

        let touching = self.touching_pairs();
        let started = touching
            .iter()
            .filter(|p| self.contacts.binary_search(p).is_err())
            .map(|&(a, b)| CollisionPair::new(a, b))
            .collect();
        self.contacts = touching;
        started
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circle(world: &mut HeadlessWorld, pos: Vec2, radius: f32) -> BodyHandle {
        let handle = world.create_body(BodyDesc {
            vertices: crate::sim::geometry::circle_vertices(radius, 12).unwrap(),
            position: pos,
            circle_radius: Some(radius),
            is_static: false,
            is_sensor: false,
            friction: 0.0,
            restitution: 0.0,
        });
        world.add_body(handle);
        handle
    }

    #[test]
    fn test_created_body_not_simulated_until_added() {
        let mut world = HeadlessWorld::new();
        let handle = world.create_body(BodyDesc {
            vertices: Vec::new(),
            position: Vec2::ZERO,
            circle_radius: Some(5.0),
            is_static: false,
            is_sensor: false,
            friction: 0.0,
            restitution: 0.0,
        });
        assert!(world.body(handle).is_none());
        world.add_body(handle);
        assert_eq!(world.body(handle).unwrap().circle_radius, Some(5.0));
    }

    #[test]
    fn test_collision_start_reported_once() {
        let mut world = HeadlessWorld::new();
        world.set_gravity(Vec2::ZERO);
        let a = circle(&mut world, Vec2::new(0.0, 0.0), 10.0);
        let b = circle(&mut world, Vec2::new(19.0, 0.0), 10.0);

        let pairs = world.step(crate::consts::SIM_DT);
        assert_eq!(pairs, vec![CollisionPair::new(a, b)]);

        // Still touching next tick, but not a new contact
        let pairs = world.step(crate::consts::SIM_DT);
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_fruit_rests_on_floor() {
        let config = GameConfig::default();
        let mut world = HeadlessWorld::with_container(&config);
        let fruit = circle(&mut world, Vec2::new(320.0, 100.0), 24.0);

        let mut hit_floor = false;
        for _ in 0..600 {
            hit_floor |= !world.step(crate::consts::SIM_DT).is_empty();
        }
        assert!(hit_floor);

        let view = world.body(fruit).unwrap();
        let floor_top = config.container_height;
        assert!((view.position.y + 24.0 - floor_top).abs() < 2.0);
    }

    #[test]
    fn test_sensor_never_collides() {
        let mut world = HeadlessWorld::new();
        world.set_gravity(Vec2::ZERO);
        circle(&mut world, Vec2::ZERO, 10.0);
        let sensor = world.create_body(BodyDesc {
            vertices: Vec::new(),
            position: Vec2::ZERO,
            circle_radius: Some(10.0),
            is_static: true,
            is_sensor: true,
            friction: 0.0,
            restitution: 0.0,
        });
        world.add_body(sensor);
        assert!(world.step(crate::consts::SIM_DT).is_empty());
    }

    #[test]
    fn test_remove_body() {
        let mut world = HeadlessWorld::new();
        let a = circle(&mut world, Vec2::ZERO, 10.0);
        world.remove_body(a);
        assert!(world.body(a).is_none());
        assert!(world.bodies().is_empty());
        // Unknown handles are ignored
        world.remove_body(BodyHandle(999));
    }
}
