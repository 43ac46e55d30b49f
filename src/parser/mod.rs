//
//  mod.rs
//  Orbit
//
//  Created by hak (tharun)
//

pub mod extractor;

pub use extractor::extract_source;
