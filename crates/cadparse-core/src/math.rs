//! 数学类型
//!
//! 直接使用 nalgebra 的点与向量类型，序列化为 `[x, y, z]` 数组。

/// 3D点
pub type Point3 = nalgebra::Point3<f64>;

/// 3D向量
pub type Vector3 = nalgebra::Vector3<f64>;
