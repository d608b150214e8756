//! Rendering of the field/element location attached to nested errors.

pub(crate) enum Segment<'a> {
    Field(&'a str),
    Element(usize),
}

/// Renders segments (outermost first) as `proposalData1.slot` or `deposits[2].index`.
pub(crate) fn render<'a>(segments: impl Iterator<Item = Segment<'a>>) -> String {
    let mut path = String::new();

    for segment in segments {
        match segment {
            Segment::Field(name) => {
                if !path.is_empty() {
                    path.push('.');
                }
                path.push_str(name);
            }
            Segment::Element(index) => {
                path.push('[');
                path.push_str(&index.to_string());
                path.push(']');
            }
        }
    }

    path
}
