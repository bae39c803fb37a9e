//! Sound-field rotators
//!
//! A rotator is a fixed fan-out/fan-in network of single-channel gain
//! nodes, one per rotation-matrix entry. Changing the listener orientation
//! only rewrites gains; the topology never changes after construction.

use af_graph::{AudioGraph, GainNode, NodeId, PassthroughNode};

use super::rotation::{
    ACN_AXIS_SIGN, IDENTITY_MATRIX3, RotationMatrix3, RotationMatrix4, SphericalHarmonicRotation,
};
use super::AmbisonicOrder;
use crate::error::{SpatialError, SpatialResult};

/// Upper-left 3x3 block of a column-major 4x4 matrix
pub fn matrix3_from_matrix4(m: &RotationMatrix4) -> RotationMatrix3 {
    [m[0], m[1], m[2], m[4], m[5], m[6], m[8], m[9], m[10]]
}

/// Homogeneous 4x4 with zero translation around a 3x3 block
pub fn matrix4_from_matrix3(m: &RotationMatrix3) -> RotationMatrix4 {
    [
        m[0], m[1], m[2], 0.0, //
        m[3], m[4], m[5], 0.0, //
        m[6], m[7], m[8], 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]
}

/// Rotation stage of the renderer
pub trait SoundFieldRotator: Sized {
    /// Order used when the configured one is unsupported
    const DEFAULT_ORDER: AmbisonicOrder;

    fn supports_order(order: AmbisonicOrder) -> bool;

    /// Add the rotation network to `graph`, initialized to identity
    fn build(graph: &mut AudioGraph, order: AmbisonicOrder) -> SpatialResult<Self>;

    fn order(&self) -> AmbisonicOrder;

    /// K-channel node feeding the rotation
    fn input(&self) -> NodeId;

    /// K-channel node carrying the rotated field
    fn output(&self) -> NodeId;

    /// Replace the rotation; every coefficient is rewritten before returning
    fn set_rotation_matrix3(
        &mut self,
        graph: &mut AudioGraph,
        matrix: &RotationMatrix3,
    ) -> SpatialResult<()>;

    /// Current world rotation (degree-1 block only)
    fn rotation_matrix3(&self) -> RotationMatrix3;

    fn set_rotation_matrix4(
        &mut self,
        graph: &mut AudioGraph,
        matrix: &RotationMatrix4,
    ) -> SpatialResult<()> {
        self.set_rotation_matrix3(graph, &matrix3_from_matrix4(matrix))
    }

    fn rotation_matrix4(&self) -> RotationMatrix4 {
        matrix4_from_matrix3(&self.rotation_matrix3())
    }
}

/// First-order rotator.
///
/// Y and X are negated on the way in and out of a 3x3 gain matrix so the
/// world-space matrix can be used directly on ACN channels.
pub struct FoaRotator {
    splitter: NodeId,
    merger: NodeId,
    /// `matrix_gains[col * 3 + row]` carries input axis `col` to output axis `row`
    matrix_gains: [NodeId; 9],
    matrix: RotationMatrix3,
}

impl SoundFieldRotator for FoaRotator {
    const DEFAULT_ORDER: AmbisonicOrder = AmbisonicOrder::First;

    fn supports_order(order: AmbisonicOrder) -> bool {
        order == AmbisonicOrder::First
    }

    fn build(graph: &mut AudioGraph, order: AmbisonicOrder) -> SpatialResult<Self> {
        if !Self::supports_order(order) {
            return Err(SpatialError::InvalidAmbisonicOrder(order.as_usize()));
        }

        let splitter = graph.add_node(Box::new(PassthroughNode::new(4)));
        let in_gains = ACN_AXIS_SIGN.map(|s| graph.add_node(Box::new(GainNode::with_gain(1, s))));
        let matrix_gains: [NodeId; 9] =
            std::array::from_fn(|_| graph.add_node(Box::new(GainNode::new(1))));
        let out_gains = ACN_AXIS_SIGN.map(|s| graph.add_node(Box::new(GainNode::with_gain(1, s))));
        let merger = graph.add_node(Box::new(PassthroughNode::new(4)));

        // W is rotation invariant
        graph.connect(splitter, 0, merger, 0)?;

        for axis in 0..3 {
            graph.connect(splitter, axis + 1, in_gains[axis], 0)?;
            graph.connect(out_gains[axis], 0, merger, axis + 1)?;
        }

        for col in 0..3 {
            for row in 0..3 {
                let gain = matrix_gains[col * 3 + row];
                graph.connect(in_gains[col], 0, gain, 0)?;
                graph.connect(gain, 0, out_gains[row], 0)?;
            }
        }

        let mut rotator = Self {
            splitter,
            merger,
            matrix_gains,
            matrix: IDENTITY_MATRIX3,
        };
        rotator.set_rotation_matrix3(graph, &IDENTITY_MATRIX3)?;

        Ok(rotator)
    }

    fn order(&self) -> AmbisonicOrder {
        AmbisonicOrder::First
    }

    fn input(&self) -> NodeId {
        self.splitter
    }

    fn output(&self) -> NodeId {
        self.merger
    }

    fn set_rotation_matrix3(
        &mut self,
        graph: &mut AudioGraph,
        matrix: &RotationMatrix3,
    ) -> SpatialResult<()> {
        for (&gain, &value) in self.matrix_gains.iter().zip(matrix) {
            graph.set_gain(gain, value)?;
        }
        self.matrix = *matrix;
        Ok(())
    }

    fn rotation_matrix3(&self) -> RotationMatrix3 {
        self.matrix
    }
}

/// Higher-order rotator.
///
/// Each degree `l` gets a `(2l+1)²` grid of gains; gain `j * (2l+1) + k`
/// carries channel `l² + j` to channel `l² + k`.
pub struct HoaRotator {
    order: AmbisonicOrder,
    splitter: NodeId,
    merger: NodeId,
    band_gains: Vec<Vec<NodeId>>,
    rotation: SphericalHarmonicRotation,
}

impl HoaRotator {
    fn update_gains(&self, graph: &mut AudioGraph) -> SpatialResult<()> {
        for (band, gains) in self.rotation.bands().iter().zip(&self.band_gains) {
            let l = band.degree() as i32;
            let rows = band.size();
            for j in 0..rows {
                for k in 0..rows {
                    graph.set_gain(gains[j * rows + k], band.get(k as i32 - l, j as i32 - l))?;
                }
            }
        }
        Ok(())
    }

    pub fn rotation(&self) -> &SphericalHarmonicRotation {
        &self.rotation
    }
}

impl SoundFieldRotator for HoaRotator {
    const DEFAULT_ORDER: AmbisonicOrder = AmbisonicOrder::Third;

    fn supports_order(_order: AmbisonicOrder) -> bool {
        true
    }

    fn build(graph: &mut AudioGraph, order: AmbisonicOrder) -> SpatialResult<Self> {
        let channels = order.channel_count();
        let splitter = graph.add_node(Box::new(PassthroughNode::new(channels)));
        let merger = graph.add_node(Box::new(PassthroughNode::new(channels)));

        graph.connect(splitter, 0, merger, 0)?;

        let mut band_gains = Vec::with_capacity(order.as_usize());
        for l in 1..=order.as_usize() {
            let rows = 2 * l + 1;
            let offset = l * l;
            let mut gains = Vec::with_capacity(rows * rows);
            for j in 0..rows {
                for k in 0..rows {
                    let gain = graph.add_node(Box::new(GainNode::new(1)));
                    graph.connect(splitter, offset + j, gain, 0)?;
                    graph.connect(gain, 0, merger, offset + k)?;
                    gains.push(gain);
                }
            }
            band_gains.push(gains);
        }

        let rotator = Self {
            order,
            splitter,
            merger,
            band_gains,
            rotation: SphericalHarmonicRotation::identity(order.as_usize()),
        };
        rotator.update_gains(graph)?;

        Ok(rotator)
    }

    fn order(&self) -> AmbisonicOrder {
        self.order
    }

    fn input(&self) -> NodeId {
        self.splitter
    }

    fn output(&self) -> NodeId {
        self.merger
    }

    fn set_rotation_matrix3(
        &mut self,
        graph: &mut AudioGraph,
        matrix: &RotationMatrix3,
    ) -> SpatialResult<()> {
        self.rotation.set_world_matrix3(matrix);
        self.update_gains(graph)
    }

    fn rotation_matrix3(&self) -> RotationMatrix3 {
        self.rotation.world_matrix3()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use af_graph::{CaptureNode, SourceNode};
    use approx::assert_abs_diff_eq;

    const QUARTER_TURN: RotationMatrix3 = [0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0];

    /// Feed per-channel constants through a rotator and capture one block
    fn render<R: SoundFieldRotator>(
        order: AmbisonicOrder,
        values: Vec<f64>,
        matrix: &RotationMatrix3,
    ) -> Vec<f64> {
        let channels = order.channel_count();
        let mut graph = AudioGraph::new(16, 48000.0).unwrap();
        let source = graph.add_node(Box::new(SourceNode::constant(values)));
        let capture = graph.add_node(Box::new(CaptureNode::new(channels)));

        let mut rotator = R::build(&mut graph, order).unwrap();
        rotator.set_rotation_matrix3(&mut graph, matrix).unwrap();
        graph.connect_channels(source, rotator.input()).unwrap();
        graph.connect_channels(rotator.output(), capture).unwrap();

        graph.process();
        let captured = graph.node::<CaptureNode>(capture).unwrap();
        (0..channels).map(|ch| captured.channel(ch).unwrap()[15]).collect()
    }

    #[test]
    fn test_foa_quarter_turn() {
        let out = render::<FoaRotator>(
            AmbisonicOrder::First,
            vec![0.0, 1.0, 2.0, 3.0],
            &QUARTER_TURN,
        );
        assert_eq!(out, vec![0.0, -2.0, 1.0, 3.0]);
    }

    #[test]
    fn test_hoa_first_order_matches_foa() {
        let out = render::<HoaRotator>(
            AmbisonicOrder::First,
            vec![0.0, 1.0, 2.0, 3.0],
            &QUARTER_TURN,
        );
        assert_eq!(out, vec![0.0, -2.0, 1.0, 3.0]);
    }

    #[test]
    fn test_identity_is_noop() {
        let values: Vec<f64> = (0..16).map(|i| i as f64 - 7.5).collect();
        let out = render::<HoaRotator>(AmbisonicOrder::Third, values.clone(), &IDENTITY_MATRIX3);
        for (a, b) in out.iter().zip(&values) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-12);
        }

        let out = render::<FoaRotator>(
            AmbisonicOrder::First,
            vec![4.0, 3.0, 2.0, 1.0],
            &IDENTITY_MATRIX3,
        );
        assert_eq!(out, vec![4.0, 3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_hoa_network_matches_operator() {
        let c = (0.6_f64).cos();
        let s = (0.6_f64).sin();
        // Rotation about the world x axis
        let matrix = [1.0, 0.0, 0.0, 0.0, c, s, 0.0, -s, c];
        let values: Vec<f64> = (0..9).map(|i| (i as f64 * 0.7).sin()).collect();

        let out = render::<HoaRotator>(AmbisonicOrder::Second, values.clone(), &matrix);

        let mut expected = vec![0.0; 9];
        SphericalHarmonicRotation::from_world_matrix3(2, &matrix).apply(&values, &mut expected);
        for (a, b) in out.iter().zip(&expected) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_foa_rejects_higher_orders() {
        let mut graph = AudioGraph::new(16, 48000.0).unwrap();
        assert!(matches!(
            FoaRotator::build(&mut graph, AmbisonicOrder::Second),
            Err(SpatialError::InvalidAmbisonicOrder(2))
        ));
    }

    #[test]
    fn test_matrix4_roundtrip() {
        let mut graph = AudioGraph::new(16, 48000.0).unwrap();
        let mut rotator = HoaRotator::build(&mut graph, AmbisonicOrder::Third).unwrap();

        let m4 = [
            0.0, -1.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            5.0, 6.0, 7.0, 1.0,
        ];
        rotator.set_rotation_matrix4(&mut graph, &m4).unwrap();

        assert_eq!(rotator.rotation_matrix3(), QUARTER_TURN);
        let back = rotator.rotation_matrix4();
        assert_eq!(&back[..12], &m4[..12]);
        assert_eq!(&back[12..], &[0.0, 0.0, 0.0, 1.0]);
    }
}
