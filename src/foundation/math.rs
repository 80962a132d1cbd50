pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y) as u8
}

pub(crate) fn lerp_u8(a: u8, b: u8, t: u16) -> u8 {
    // t is 0..=255; 255 yields exactly b, 0 yields exactly a.
    let a = u16::from(a);
    let b = u16::from(b);
    let it = 255 - t;
    ((u32::from(a) * u32::from(it) + u32::from(b) * u32::from(t) + 127) / 255) as u8
}
