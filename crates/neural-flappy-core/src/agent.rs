use crate::nn::NeuralNet;

/// One bird: vertical state plus the network that controls it.
/// The horizontal lane is fixed by the environment.
#[derive(Clone, Debug)]
pub struct Agent {
    pub position: f32,
    pub velocity: f32,
    pub alive: bool,
    pub network: NeuralNet,
}

impl Agent {
    pub fn new(network: NeuralNet, position: f32, velocity: f32) -> Self {
        Self {
            position,
            velocity,
            alive: true,
            network,
        }
    }

    pub fn respawn(&mut self, position: f32, velocity: f32) {
        self.position = position;
        self.velocity = velocity;
        self.alive = true;
    }
}
