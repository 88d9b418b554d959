//! Collision, physics and movement toggles owned by a character
//!
//! The physics engine itself is external. The rig records what the core
//! asked of it (collision profiles, simulation on/off, sleep state,
//! attachment) so the host can mirror it into whatever engine it runs.
//! Every component is optional; effects on a missing one are skipped.

/// Collision enablement for a primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionMode {
    NoCollision,
    QueryOnly,
    PhysicsOnly,
    QueryAndPhysics,
}

/// Per-channel collision response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    Ignore,
    Overlap,
    Block,
}

/// Collision channels a primitive responds to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    WorldStatic,
    WorldDynamic,
    Pawn,
    Visibility,
    Camera,
    PhysicsBody,
    Vehicle,
    Destructible,
}

impl Channel {
    pub const ALL: [Channel; 8] = [
        Channel::WorldStatic,
        Channel::WorldDynamic,
        Channel::Pawn,
        Channel::Visibility,
        Channel::Camera,
        Channel::PhysicsBody,
        Channel::Vehicle,
        Channel::Destructible,
    ];

    /// Channels a ragdoll keeps blocking so it still lands on the world
    pub const PHYSICS: [Channel; 3] = [
        Channel::WorldStatic,
        Channel::WorldDynamic,
        Channel::PhysicsBody,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Response table covering every channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelResponses([Response; Channel::ALL.len()]);

impl ChannelResponses {
    pub fn all(response: Response) -> Self {
        Self([response; Channel::ALL.len()])
    }

    pub fn get(&self, channel: Channel) -> Response {
        self.0[channel.index()]
    }

    pub fn set(&mut self, channel: Channel, response: Response) {
        self.0[channel.index()] = response;
    }

    /// Spawn profile for the visual mesh: blocks everything but the camera
    pub fn character_mesh() -> Self {
        let mut responses = Self::all(Response::Block);
        responses.set(Channel::Camera, Response::Ignore);
        responses
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Movement capsule of the character controller
#[derive(Debug, Clone, PartialEq)]
pub struct Capsule {
    pub half_height: f32,
    pub collision: CollisionMode,
    pub responses: ChannelResponses,
}

impl Capsule {
    pub fn new(half_height: f32) -> Self {
        Self {
            half_height,
            collision: CollisionMode::QueryAndPhysics,
            responses: ChannelResponses::all(Response::Block),
        }
    }
}

/// Skeletal mesh and its rigid bodies
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub collision: CollisionMode,
    pub responses: ChannelResponses,
    /// Simulation flag applied to all bodies
    pub simulate_physics: bool,
    pub bodies_awake: bool,
    pub attached_to_capsule: bool,
    pub relative_location: Vec3,
    /// Degrees
    pub relative_yaw: f32,
    pub linear_velocity: Vec3,
    /// Degrees per second
    pub angular_velocity: Vec3,
}

impl Mesh {
    /// Mesh yaw relative to the capsule so it faces along the movement axis
    pub const REST_YAW: f32 = -90.0;

    pub fn attached(capsule_half_height: f32) -> Self {
        Self {
            collision: CollisionMode::QueryOnly,
            responses: ChannelResponses::character_mesh(),
            simulate_physics: false,
            bodies_awake: false,
            attached_to_capsule: true,
            relative_location: Vec3::new(0.0, 0.0, -capsule_half_height),
            relative_yaw: Self::REST_YAW,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementMode {
    /// Movement disabled
    None,
    Walking,
    Falling,
}

/// Character-controller movement component
#[derive(Debug, Clone, PartialEq)]
pub struct Movement {
    pub mode: MovementMode,
    pub velocity: Vec3,
    pub accumulated_force: Vec3,
}

impl Default for Movement {
    fn default() -> Self {
        Self {
            mode: MovementMode::Walking,
            velocity: Vec3::ZERO,
            accumulated_force: Vec3::ZERO,
        }
    }
}

impl Movement {
    fn stop_immediately(&mut self) {
        self.velocity = Vec3::ZERO;
    }
}

/// Everything the combat hooks toggle on a character
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterRig {
    pub capsule: Option<Capsule>,
    pub mesh: Option<Mesh>,
    pub movement: Option<Movement>,
    pub input_enabled: bool,
}

impl CharacterRig {
    /// Fully assembled rig in its spawn configuration
    pub fn new(capsule_half_height: f32) -> Self {
        Self {
            capsule: Some(Capsule::new(capsule_half_height)),
            mesh: Some(Mesh::attached(capsule_half_height)),
            movement: Some(Movement::default()),
            input_enabled: true,
        }
    }

    /// Rig with no components at all; every effect is a no-op on it
    pub fn empty() -> Self {
        Self {
            capsule: None,
            mesh: None,
            movement: None,
            input_enabled: true,
        }
    }

    pub fn set_input_enabled(&mut self, enabled: bool) {
        self.input_enabled = enabled;
    }

    /// Take the character out of gameplay collision. Shared by the death
    /// path and the ragdoll-active effect; safe to repeat.
    pub fn disable_collision(&mut self) {
        if let Some(capsule) = self.capsule.as_mut() {
            capsule.collision = CollisionMode::NoCollision;
            capsule.responses = ChannelResponses::all(Response::Ignore);
        }

        if let Some(mesh) = self.mesh.as_mut() {
            mesh.responses = ChannelResponses::all(Response::Ignore);
            for channel in Channel::PHYSICS {
                mesh.responses.set(channel, Response::Block);
            }
        }

        if let Some(movement) = self.movement.as_mut() {
            movement.stop_immediately();
            movement.mode = MovementMode::None;
        }
    }

    /// Observer-side effect of `isRagdoll = true`
    pub fn enter_ragdoll(&mut self) {
        let Some(mesh) = self.mesh.as_mut() else {
            return;
        };
        mesh.collision = CollisionMode::QueryAndPhysics;
        mesh.simulate_physics = true;
        mesh.bodies_awake = true;

        self.disable_collision();
    }

    /// Observer-side effect of `isRagdoll = false`
    pub fn leave_ragdoll(&mut self) {
        let half_height = self.capsule.as_ref().map(|c| c.half_height);
        let Some(mesh) = self.mesh.as_mut() else {
            return;
        };
        mesh.simulate_physics = false;
        mesh.bodies_awake = false;

        if let Some(half_height) = half_height {
            mesh.attached_to_capsule = true;
            mesh.relative_location = Vec3::new(0.0, 0.0, -half_height);
            mesh.relative_yaw = Mesh::REST_YAW;
        }

        mesh.linear_velocity = Vec3::ZERO;
        mesh.angular_velocity = Vec3::ZERO;
    }

    /// Authority-side rig reset performed by a respawn
    pub fn restore_after_respawn(&mut self) {
        self.input_enabled = true;
        self.restore_collision();
    }

    /// Undo [`CharacterRig::disable_collision`]: spawn collision profiles
    /// and walking movement. Input is left alone.
    pub fn restore_collision(&mut self) {
        if let Some(capsule) = self.capsule.as_mut() {
            capsule.collision = CollisionMode::QueryAndPhysics;
            capsule.responses = ChannelResponses::all(Response::Block);
        }

        if let Some(mesh) = self.mesh.as_mut() {
            mesh.collision = CollisionMode::QueryOnly;
            mesh.responses = ChannelResponses::character_mesh();
        }

        if let Some(movement) = self.movement.as_mut() {
            movement.mode = MovementMode::Walking;
            movement.stop_immediately();
            movement.accumulated_force = Vec3::ZERO;
        }
    }

    pub fn is_simulating(&self) -> bool {
        self.mesh.as_ref().is_some_and(|m| m.simulate_physics)
    }
}
