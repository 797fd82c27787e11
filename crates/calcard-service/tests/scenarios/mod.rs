mod contacts;
mod helpers;
mod series;
