//! Thumbnail rendering with upper half blocks.
//!
//! Each terminal cell shows two vertically stacked pixels: the glyph takes
//! the top colour and the cell background the bottom one.

use image::{ imageops::FilterType, DynamicImage };
use ratatui::{
    style::{ Color, Style },
    text::{ Line, Span },
};


const HALF_BLOCK: &str = "\u{2580}";


/// Renders `image` to fit within `width` x `height` cells, keeping its aspect.
pub fn half_blocks( image: &DynamicImage, width: u16, height: u16 ) -> Vec<Line<'static>> {
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let scaled = image
        .resize( u32::from( width ), u32::from( height ) * 2, FilterType::Triangle )
        .to_rgb8();
    let ( w, h ) = scaled.dimensions();

    ( 0..h )
        .step_by( 2 )
        .map( |y| {
            let spans: Vec<Span<'static>> = ( 0..w )
                .map( |x| {
                    let top = scaled.get_pixel( x, y ).0;
                    let bottom = if y + 1 < h { scaled.get_pixel( x, y + 1 ).0 } else { top };
                    Span::styled(
                        HALF_BLOCK,
                        Style::default()
                            .fg( Color::Rgb( top[ 0 ], top[ 1 ], top[ 2 ] ) )
                            .bg( Color::Rgb( bottom[ 0 ], bottom[ 1 ], bottom[ 2 ] ) ),
                    )
                })
                .collect();
            Line::from( spans )
        })
        .collect()
}


#[cfg( test )]
mod tests {
    use super::*;
    use image::RgbImage;


    #[test]
    fn test_fits_thumbnail_into_cells() {
        let img = DynamicImage::ImageRgb8( RgbImage::from_pixel( 120, 90, image::Rgb( [ 255, 0, 0 ] ) ) );

        let lines = half_blocks( &img, 40, 15 );

        assert_eq!( lines.len(), 15 );
        assert!( lines.iter().all( |line| line.spans.len() == 40 ) );
        assert_eq!( lines[ 0 ].spans[ 0 ].style.fg, Some( Color::Rgb( 255, 0, 0 ) ) );
    }


    #[test]
    fn test_empty_area_renders_nothing() {
        let img = DynamicImage::ImageRgb8( RgbImage::new( 4, 4 ) );
        assert!( half_blocks( &img, 0, 10 ).is_empty() );
    }
}
