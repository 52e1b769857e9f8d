//! A small but realistic track-archive document.
//!
//! 48 kHz, 120 BPM jumping to 60 BPM at tick 7680 (eight seconds in). It holds
//! an audio track (musical domain) with three events sharing one clip, a
//! marker track (linear domain) with two `Verse` ranges, a MIDI track with one
//! part, and a stray range marker outside any track.

pub const DEMO_SAMPLE_RATE: f64 = 48_000.0;

/// Long enough for every demo region except the last `Verse`.
pub const DEMO_MEDIA_LENGTH_SECONDS: f64 = 13.0;

pub const DEMO_TRACK_DOCUMENT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<tracklist2>
   <list name="track" type="obj">
      <obj class="MAudioTrackEvent" ID="101">
         <int name="Flags" value="1"/>
         <member name="Domain">
            <int name="Type" value="0"/>
            <float name="Period" value="1"/>
         </member>
         <obj class="MListNode" name="Node" ID="102">
            <string name="Name" value="Guitars" wide="true"/>
            <obj class="MAudioTrackEvent" name="Track Device" ID="103"/>
         </obj>
         <list name="Events" type="obj">
            <obj class="MAudioEvent" ID="110">
               <obj class="PAudioClip" name="AudioClip" ID="10">
                  <obj class="FNPath" name="Path" ID="111">
                     <string name="Name" value="guitar_take.wav"/>
                     <string name="Path" value="/sessions/demo/Audio"/>
                  </obj>
                  <string name="Name" value="Guitar_01"/>
                  <float name="SampleRate" value="48000"/>
               </obj>
               <float name="Start" value="1920"/>
               <float name="Length" value="96000"/>
               <float name="Offset" value="0"/>
            </obj>
            <obj class="MAudioEvent" ID="112">
               <obj name="AudioClip" ID="10"/>
               <string name="Description" value="Chorus"/>
               <float name="Start" value="5760"/>
               <float name="Length" value="48000"/>
            </obj>
            <obj class="MAudioEvent" ID="113">
               <obj name="AudioClip" ID="10"/>
               <float name="Start" value="0"/>
               <float name="Length" value="24000"/>
            </obj>
         </list>
      </obj>
      <obj class="MMarkerTrackEvent" ID="201">
         <member name="Domain">
            <int name="Type" value="1"/>
         </member>
         <list name="Events" type="obj">
            <obj class="MRangeMarkerEvent" ID="210">
               <float name="Start" value="8"/>
               <float name="Length" value="4"/>
               <string name="Name" value="Verse"/>
            </obj>
            <obj class="MRangeMarkerEvent" ID="211">
               <float name="Start" value="12"/>
               <float name="Length" value="2"/>
               <string name="Name" value="Verse"/>
            </obj>
         </list>
      </obj>
      <obj class="MMidiTrackEvent" ID="301">
         <member name="Domain">
            <int name="Type" value="0"/>
         </member>
         <list name="Events" type="obj">
            <obj class="MMidiPartEvent" ID="310">
               <obj class="MMidiPart" name="Part" ID="311">
                  <string name="Name" value="Bass line"/>
               </obj>
               <float name="Start" value="7680"/>
               <float name="Length" value="960"/>
            </obj>
         </list>
      </obj>
   </list>
   <obj class="MRangeMarkerEvent" ID="400">
      <float name="Start" value="1"/>
      <float name="Length" value="1"/>
      <string name="Name" value="Orphan"/>
   </obj>
   <obj class="MTempoTrackEvent" name="Tempo Track" ID="500">
      <list name="TempoEvent" type="obj">
         <obj class="MTempoEvent" ID="501">
            <float name="BPM" value="120"/>
            <float name="PPQ" value="0"/>
         </obj>
         <obj class="MTempoEvent" ID="502">
            <float name="BPM" value="60"/>
            <float name="PPQ" value="7680"/>
            <int name="Func" value="0"/>
         </obj>
      </list>
      <float name="RehearsalTempo" value="120"/>
      <int name="RehearsalMode" value="0"/>
   </obj>
   <obj class="PArrangeSetup" name="Setup" ID="600">
      <float name="SampleRate" value="48000"/>
      <int name="SampleFormatSize" value="3"/>
   </obj>
</tracklist2>
"#;

#[must_use]
pub fn demo_track_document() -> &'static str {
    DEMO_TRACK_DOCUMENT
}

/// `(name, start_seconds, end_seconds)` of every demo region, in output order.
#[must_use]
pub fn demo_expected_regions() -> Vec<(&'static str, f64, f64)> {
    vec![
        ("Guitar_01_0001", 0.0, 0.5),
        ("Guitar_01_0002", 2.0, 4.0),
        ("Chorus", 6.0, 7.0),
        ("Verse_0001", 8.0, 12.0),
        ("Bass line", 8.0, 10.0),
        ("Verse_0002", 12.0, 14.0),
    ]
}
